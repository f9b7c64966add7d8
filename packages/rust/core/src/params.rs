//! Request parameter filling and URL construction.

use std::fmt;

use entsoe_shared::{DATE_FORMAT, DatasetDescriptor, EntsoeError, Result, TimeInterval};
use tracing::debug;
use url::Url;

/// Query key carrying the API key.
const TOKEN_KEY: &str = "securityToken";

/// Ordered `key=value` parameters of one request, without the API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Request URL: `base?securityToken=<key>&k=v...`.
    pub fn to_url(&self, base_url: &str, api_key: &str) -> Result<Url> {
        let mut url = Url::parse(base_url)
            .map_err(|e| EntsoeError::config(format!("invalid base URL '{base_url}': {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(TOKEN_KEY, api_key);
            for (k, v) in &self.pairs {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// `k=v&k=v` rendering, safe to log and to store in result rows.
impl fmt::Display for RequestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Fill a dataset's mandatory fields for one area pair and interval.
///
/// Keys are matched case-insensitively by fragment. A constant whose key
/// contains the field name seeds the value; then `start` takes the interval
/// start, `date` the start day, `end` the interval end, origin-side area
/// fragments the origin code, and destination fragments the destination code.
/// Fields left without a value are omitted.
pub fn fill_parameters(
    descriptor: &DatasetDescriptor,
    origin: &str,
    destination: Option<&str>,
    interval: &TimeInterval,
) -> RequestParams {
    let mut pairs = Vec::with_capacity(descriptor.mandatory_fields().len());

    for field in descriptor.mandatory_fields() {
        let k = field.to_lowercase();

        let mut value: Option<String> = descriptor
            .constants()
            .iter()
            .find(|c| c.key.to_lowercase().contains(&k))
            .map(|c| c.value.clone());

        if k.contains("start") {
            value = Some(interval.start_canonical());
        } else if k.contains("date") {
            value = Some(interval.start().format(DATE_FORMAT).to_string());
        }
        if k.contains("end") {
            value = Some(interval.end_canonical());
        }
        if ["in_domain", "area", "connecting", "biddingzone"]
            .iter()
            .any(|f| k.contains(f))
        {
            value = Some(origin.to_string());
        }
        if k.contains("out_domain") || k.contains("acquiring") {
            value = destination.map(str::to_string);
        }

        match value {
            Some(v) => pairs.push((field.clone(), v)),
            None => debug!(field = %field, "mandatory field left empty"),
        }
    }

    RequestParams { pairs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entsoe_shared::ConstantField;

    fn interval() -> TimeInterval {
        TimeInterval::parse_canonical("202101010000", "202101020000").unwrap()
    }

    fn load_descriptor() -> DatasetDescriptor {
        DatasetDescriptor::new(
            "Actual Total Load",
            [
                "documentType",
                "processType",
                "outBiddingZone_Domain",
                "periodStart",
                "periodEnd",
            ],
            vec![
                ConstantField {
                    key: "documentType".into(),
                    value: "A65".into(),
                },
                ConstantField {
                    key: "processType".into(),
                    value: "A16".into(),
                },
            ],
        )
    }

    #[test]
    fn fills_constants_interval_and_origin() {
        let params = fill_parameters(&load_descriptor(), "10YDK-1--------W", None, &interval());
        assert_eq!(params.get("documentType"), Some("A65"));
        assert_eq!(params.get("processType"), Some("A16"));
        assert_eq!(params.get("outBiddingZone_Domain"), Some("10YDK-1--------W"));
        assert_eq!(params.get("periodStart"), Some("202101010000"));
        assert_eq!(params.get("periodEnd"), Some("202101020000"));
        assert_eq!(
            params.to_string(),
            "documentType=A65&processType=A16&outBiddingZone_Domain=10YDK-1--------W&periodStart=202101010000&periodEnd=202101020000"
        );
    }

    #[test]
    fn destination_applied_last() {
        let d = DatasetDescriptor::new(
            "Flow",
            ["documentType", "in_Domain", "out_Domain", "periodStart", "periodEnd"],
            vec![ConstantField {
                key: "documentType".into(),
                value: "A11".into(),
            }],
        );
        let params = fill_parameters(&d, "A", Some("B"), &interval());
        assert_eq!(params.get("in_Domain"), Some("A"));
        assert_eq!(params.get("out_Domain"), Some("B"));
    }

    #[test]
    fn date_fields_use_day_format() {
        let d = DatasetDescriptor::new("Outages", ["updateDate"], vec![]);
        let params = fill_parameters(&d, "A", None, &interval());
        assert_eq!(params.get("updateDate"), Some("2021-01-01"));
    }

    #[test]
    fn missing_destination_is_omitted() {
        let d = DatasetDescriptor::new("Flow", ["in_Domain", "out_Domain"], vec![]);
        let params = fill_parameters(&d, "A", None, &interval());
        assert_eq!(params.get("out_Domain"), None);
        assert_eq!(params.pairs().len(), 1);
    }

    #[test]
    fn url_starts_with_token() {
        let params = fill_parameters(&load_descriptor(), "X", None, &interval());
        let url = params
            .to_url("https://web-api.tp.entsoe.eu/api", "secret")
            .unwrap();
        let query = url.query().unwrap();
        assert!(query.starts_with("securityToken=secret&documentType=A65"));
        assert_eq!(url.path(), "/api");
    }

    #[test]
    fn bad_base_url_is_config_error() {
        let params = fill_parameters(&load_descriptor(), "X", None, &interval());
        assert!(matches!(
            params.to_url("not a url", "k"),
            Err(EntsoeError::Config { .. })
        ));
    }
}
