//! VDL2 message decoding
//!
//! dumpvdl2 publishes one JSON object per line. The AVLC payload carries
//! either an ACARS text block (weather in airline-specific formats) or an
//! XID frame whose parameters may advertise the aircraft location.

pub mod acars;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Vdl2Line {
    pub vdl2: Option<Vdl2Body>,
}

#[derive(Debug, Deserialize)]
pub struct Vdl2Body {
    pub avlc: Option<Avlc>,
}

#[derive(Debug, Deserialize)]
pub struct Avlc {
    pub src: Option<AvlcAddress>,
    pub acars: Option<AcarsBlock>,
    pub xid: Option<XidBlock>,
}

#[derive(Debug, Deserialize)]
pub struct AvlcAddress {
    pub addr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcarsBlock {
    pub flight: Option<String>,
    pub reg: Option<String>,
    pub msg_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XidBlock {
    #[serde(default)]
    pub vdl_params: Vec<XidParam>,
}

#[derive(Debug, Deserialize)]
pub struct XidParam {
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Aircraft location advertised in an XID frame
#[derive(Debug, Clone, PartialEq)]
pub struct XidLocation {
    pub altitude_ft: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Vdl2Line {
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    fn avlc(&self) -> Option<&Avlc> {
        self.vdl2.as_ref()?.avlc.as_ref()
    }

    /// Source aircraft address, upper-case hex
    pub fn icao(&self) -> Option<String> {
        let addr = self.avlc()?.src.as_ref()?.addr.as_deref()?;
        if addr.is_empty() {
            return None;
        }
        Some(addr.to_uppercase())
    }

    /// Flight identifier of the ACARS block, if any
    pub fn flight(&self) -> Option<&str> {
        self.avlc()?
            .acars
            .as_ref()?
            .flight
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    /// Weather content of the ACARS text, if any format matches
    pub fn weather(&self) -> Option<acars::AcarsWeather> {
        let text = self.avlc()?.acars.as_ref()?.msg_text.as_deref()?;
        acars::parse_weather(text)
    }

    /// Location from an `ac_location` XID parameter
    pub fn xid_location(&self) -> Option<XidLocation> {
        let xid = self.avlc()?.xid.as_ref()?;
        let value = xid
            .vdl_params
            .iter()
            .find(|p| p.name.as_deref() == Some("ac_location"))
            .map(|p| &p.value)?;

        let altitude_ft = value.get("alt")?.as_f64()?;
        let loc = value.get("loc");
        Some(XidLocation {
            altitude_ft,
            latitude: loc.and_then(|l| l.get("lat")).and_then(Value::as_f64),
            longitude: loc.and_then(|l| l.get("lon")).and_then(Value::as_f64),
        })
    }
}
