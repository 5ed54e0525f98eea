use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Row of the facility list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "nominalPower")]
    pub nominal_power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarReading {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "active_power_kW")]
    pub active_power_kw: f64,
    #[serde(rename = "energy_kWh")]
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "nominalPower")]
    pub nominal_power: f64,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "solarData", default)]
    pub solar_data: Vec<SolarReading>,
}

impl Facility {
    pub fn has_solar_data(&self) -> bool {
        !self.solar_data.is_empty()
    }

    /// Highest active power in the uploaded data
    pub fn peak_power_kw(&self) -> Option<f64> {
        self.solar_data
            .iter()
            .map(|r| r.active_power_kw)
            .fold(None, |max, v| Some(max.map_or(v, |m: f64| m.max(v))))
    }

    /// Energy produced between the first and last reading.
    /// `energy_kWh` is a running meter value.
    pub fn energy_produced_kwh(&self) -> Option<f64> {
        let first = self.solar_data.iter().min_by_key(|r| r.timestamp)?;
        let last = self.solar_data.iter().max_by_key(|r| r.timestamp)?;
        Some(last.energy_kwh - first.energy_kwh)
    }

    /// Peak power as a share of nominal power, in percent
    pub fn peak_utilisation(&self) -> Option<f64> {
        if self.nominal_power <= 0.0 {
            return None;
        }
        self.peak_power_kw().map(|peak| peak * 100.0 / self.nominal_power)
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds, as number or string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    let millis = match &value {
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            s.parse::<i64>().ok()
        }
        _ => None,
    };

    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", value)))
}
