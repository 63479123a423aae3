use axum::http::{header, HeaderMap};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, HashMap};

use crate::projection::Column;

pub const COLUMNS_COOKIE: &str = "columns";

/// Which table columns the administrator wants to see. Anything missing or
/// unreadable counts as visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnVisibility(BTreeMap<Column, bool>);

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self(Column::all().into_iter().map(|c| (c, true)).collect())
    }
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: Column) -> bool {
        self.0.get(&column).copied().unwrap_or(true)
    }

    pub fn visible(&self) -> Vec<Column> {
        Column::all()
            .into_iter()
            .filter(|c| self.is_visible(*c))
            .collect()
    }

    /// Parses the serialized mapping, falling back to the default on any
    /// error. Unknown column names are ignored.
    pub fn parse(serialized: &str) -> Self {
        let mapping: HashMap<String, bool> = match serde_json::from_str(serialized) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::debug!("Ignoring unreadable column preferences: {}", e);
                return Self::default();
            }
        };

        let mut visibility = Self::default();
        for (name, visible) in mapping {
            if let Ok(column) = name.parse::<Column>() {
                visibility.0.insert(column, visible);
            }
        }
        visibility
    }

    pub fn serialize(&self) -> String {
        let mapping: BTreeMap<&str, bool> =
            self.0.iter().map(|(c, v)| (c.name(), *v)).collect();
        serde_json::to_string(&mapping).unwrap_or_else(|_| "{}".to_string())
    }

    /// Reads the preference cookie from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == COLUMNS_COOKIE)
            .and_then(|(_, value)| percent_decode_str(value).decode_utf8().ok())
            .map(|json| Self::parse(&json))
            .unwrap_or_default()
    }

    /// Builds the visibility from a submitted form where checked boxes are
    /// present under the column's name.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        Self(
            Column::all()
                .into_iter()
                .map(|c| (c, form.contains_key(c.name())))
                .collect(),
        )
    }

    pub fn set_cookie(&self) -> String {
        format!(
            "{}={}; Path=/; Max-Age=31536000; SameSite=Lax",
            COLUMNS_COOKIE,
            utf8_percent_encode(&self.serialize(), NON_ALPHANUMERIC)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn corrupt_or_missing_preferences_fall_back_to_all_visible() {
        assert_eq!(ColumnVisibility::parse("{not json"), ColumnVisibility::default());
        assert_eq!(ColumnVisibility::from_headers(&HeaderMap::new()).visible().len(), 9);
    }

    #[test]
    fn stored_mapping_hides_columns() {
        let visibility = ColumnVisibility::parse(r#"{"comment": false, "bogus": false}"#);

        assert!(!visibility.is_visible(Column::Comment));
        assert!(visibility.is_visible(Column::Score));
        assert_eq!(visibility.visible().len(), 8);
    }

    #[test]
    fn cookie_round_trips_through_headers() {
        let mut form = HashMap::new();
        form.insert("sender".to_string(), "on".to_string());
        form.insert("score".to_string(), "on".to_string());
        let visibility = ColumnVisibility::from_form(&form);

        let set_cookie = visibility.set_cookie();
        let value = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {value}")).unwrap(),
        );

        let read = ColumnVisibility::from_headers(&headers);
        assert_eq!(read.visible(), vec![Column::Sender, Column::Score]);
    }
}
