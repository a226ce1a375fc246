use serde_json::Value;
use vendabot_core::{Config, Paths};

/// Get a config value by dot-separated key path.
pub async fn get(key: &str) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let json = serde_json::to_value(&config)?;

    match resolve_json_path(&json, key) {
        Some(v) => {
            if v.is_string() {
                println!("{}", v.as_str().unwrap());
            } else {
                println!("{}", serde_json::to_string_pretty(&v)?);
            }
        }
        None => {
            eprintln!("Key '{}' not found in config.", key);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Set a config value by dot-separated key path.
pub async fn set(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let mut json = serde_json::to_value(&config)?;

    // Try to parse value as JSON, fall back to string
    let parsed: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    set_json_path(&mut json, key, parsed.clone());

    // Round-trip through Config so a bad key or type fails before saving
    let new_config: Config = serde_json::from_value(json)?;
    new_config.save(&paths.config_file())?;

    if parsed.is_string() {
        println!("✓ Set {} = {}", key, parsed.as_str().unwrap());
    } else {
        println!("✓ Set {} = {}", key, serde_json::to_string(&parsed)?);
    }
    Ok(())
}

/// Print the config file path.
pub async fn path() -> anyhow::Result<()> {
    let paths = Paths::new();
    println!("{}", paths.config_file().display());
    Ok(())
}

/// Navigate a JSON value by dot-separated path.
fn resolve_json_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;
    for part in path.split('.') {
        // Accept snake_case keys for the camelCase config file
        let camel = to_camel_case(part);
        if let Some(v) = current.get(&camel) {
            current = v;
        } else if let Some(v) = current.get(part) {
            current = v;
        } else {
            return None;
        }
    }
    Some(current.clone())
}

/// Set a value in a JSON object by dot-separated path.
fn set_json_path(json: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        let camel = to_camel_case(part);
        let key = if current.get(&camel).is_some() {
            camel
        } else {
            part.to_string()
        };

        if i == parts.len() - 1 {
            current[&key] = value;
            return;
        }

        if current.get(&key).is_none() || !current[&key].is_object() {
            current[&key] = serde_json::json!({});
        }
        current = &mut current[&key];
    }
}

/// Convert snake_case to camelCase.
fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(ch.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_nested_key() {
        let v = json!({"agents": {"defaults": {"model": "llama-3.1-8b-instant"}}});
        let got = resolve_json_path(&v, "agents.defaults.model").unwrap();
        assert_eq!(got, json!("llama-3.1-8b-instant"));
    }

    #[test]
    fn resolve_snake_case_maps_to_camel() {
        let v = json!({"agents": {"defaults": {"maxTokens": 1024}}});
        let got = resolve_json_path(&v, "agents.defaults.max_tokens").unwrap();
        assert_eq!(got, json!(1024));
    }

    #[test]
    fn resolve_missing_key_is_none() {
        let v = json!({"agents": {}});
        assert!(resolve_json_path(&v, "agents.defaults.model").is_none());
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut v = json!({});
        set_json_path(&mut v, "channels.whatsapp.enabled", json!(true));
        assert_eq!(v["channels"]["whatsapp"]["enabled"], json!(true));
    }

    #[test]
    fn set_overwrites_existing_leaf() {
        let mut v = json!({"agents": {"defaults": {"temperature": 0.7}}});
        set_json_path(&mut v, "agents.defaults.temperature", json!(0.2));
        assert_eq!(v["agents"]["defaults"]["temperature"], json!(0.2));
    }
}
