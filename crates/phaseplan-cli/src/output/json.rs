use std::io;

use phaseplan_client::contracts::envelope::failure_from_error;
use phaseplan_client::{ClientError, SuccessEnvelope};
use serde::Serialize;

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    serialize_json_pretty(success)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(|error| io::Error::other(error.to_string()))
}

#[cfg(test)]
mod tests {
    use phaseplan_client::ClientError;
    use phaseplan_client::contracts::envelope::success;
    use serde_json::{Value, json};

    use super::{render_error_json, render_success_json};

    #[test]
    fn success_json_keeps_the_envelope() {
        let envelope = success("rule check", json!({ "is_valid": true }));
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            let rendered = render_success_json(&envelope);
            assert!(rendered.is_ok());
            if let Ok(text) = rendered {
                let parsed = serde_json::from_str::<Value>(&text);
                assert!(parsed.is_ok());
                if let Ok(value) = parsed {
                    assert_eq!(value["ok"], Value::Bool(true));
                    assert_eq!(value["command"], Value::String("rule check".to_string()));
                    assert_eq!(value["data"]["is_valid"], Value::Bool(true));
                }
            }
        }
    }

    #[test]
    fn error_json_carries_code_recovery_and_data() {
        let error = ClientError::phase_set_invalid(vec!["overlap".to_string()]);
        let rendered = render_error_json(&error);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed = serde_json::from_str::<Value>(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(value["ok"], Value::Bool(false));
                assert_eq!(
                    value["error"]["code"],
                    Value::String("phase_set_invalid".to_string())
                );
                assert_eq!(value["error"]["internal"], Value::Bool(false));
                assert_eq!(value["data"]["errors"][0], Value::String("overlap".to_string()));
            }
        }
    }
}
