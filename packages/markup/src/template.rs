use serde::{Deserialize, Serialize};

/// Call data of a `{{target|param|...}}` transclusion, stored as JSON in the
/// wrapper's `data-mw` attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCall {
    pub target: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl TemplateCall {
    /// Split the text between `{{` and `}}`. `None` when there is no name.
    pub fn parse(inner: &str) -> Option<Self> {
        let mut parts = inner.split('|');
        let target = parts.next()?.trim();
        if target.is_empty() {
            return None;
        }
        Some(Self {
            target: target.to_string(),
            params: parts.map(str::to_string).collect(),
        })
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::from("{{");
        out.push_str(&self.target);
        for param in &self.params {
            out.push('|');
            out.push_str(param);
        }
        out.push_str("}}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_regenerate() {
        let call = TemplateCall::parse(" echo |a| b=c ").unwrap();
        assert_eq!(call.target, "echo");
        assert_eq!(call.params, vec!["a", " b=c "]);
        assert_eq!(call.to_markup(), "{{echo|a| b=c }}");
        assert_eq!(TemplateCall::from_json(&call.to_json()), Some(call));
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(TemplateCall::parse("  |x"), None);
        assert_eq!(TemplateCall::parse(""), None);
    }
}
