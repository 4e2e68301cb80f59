use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{Batch, DisplayMode, LookupRecord, SecurityRecommendation};

/// A visible column: the record field it shows and its header label.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
}

const EXTERNAL_COLUMNS: &[Column] = &[
    Column { key: "ip", label: "IP" },
    Column { key: "hostname", label: "Hostname" },
    Column { key: "country", label: "Country" },
    Column { key: "city", label: "City" },
    Column { key: "open_ports", label: "Open Ports" },
    Column { key: "abuse_score", label: "Abuse Score" },
    Column { key: "status", label: "Status" },
];

const INTERNAL_COLUMNS: &[Column] = &[
    Column { key: "ip", label: "IP" },
    Column { key: "open_ports_details", label: "Open Ports Details" },
    Column { key: "security_recommendations", label: "Security Recommendations" },
    Column { key: "status", label: "Status" },
];

/// Ordered column schema for a mode. Shared by rendering and export.
pub fn columns_for(mode: DisplayMode) -> &'static [Column] {
    match mode {
        DisplayMode::External => EXTERNAL_COLUMNS,
        DisplayMode::Internal => INTERNAL_COLUMNS,
    }
}

/// Cosmetic row class derived from the status text.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowClass {
    Cached,
    Analyzed,
    Error,
}

impl RowClass {
    pub fn css_class(self) -> &'static str {
        match self {
            RowClass::Cached => "status-cached",
            RowClass::Analyzed => "status-analyzed",
            RowClass::Error => "status-error",
        }
    }
}

/// Classify a status string. Precedence is error, then analyzed, then cached.
///
/// Error markers match case-insensitively so both the API's `error`/`Unauthorized`
/// and the client's own `Erro:` prefix are caught.
pub fn classify(status: &str) -> Option<RowClass> {
    let lower = status.to_lowercase();
    if lower.contains("erro") || lower.contains("unauthorized") {
        Some(RowClass::Error)
    } else if status.contains("analyzed") {
        Some(RowClass::Analyzed)
    } else if status.contains("cached") {
        Some(RowClass::Cached)
    } else {
        None
    }
}

/// The value of one record field, typed for ordering and formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
    Json(&'a serde_json::Value),
    Recommendations(&'a [SecurityRecommendation]),
}

impl<'a> CellValue<'a> {
    fn of(record: &'a LookupRecord, key: &str) -> CellValue<'a> {
        fn text(v: &Option<String>) -> CellValue<'_> {
            v.as_deref().map_or(CellValue::Missing, CellValue::Text)
        }
        match key {
            "ip" => CellValue::Text(&record.ip),
            "hostname" => text(&record.hostname),
            "country" => text(&record.country),
            "city" => text(&record.city),
            "open_ports" => match &record.open_ports {
                None | Some(serde_json::Value::Null) => CellValue::Missing,
                Some(serde_json::Value::String(s)) => CellValue::Text(s),
                Some(serde_json::Value::Number(n)) => {
                    n.as_f64().map_or(CellValue::Missing, CellValue::Number)
                }
                Some(other) => CellValue::Json(other),
            },
            "abuse_score" => record
                .abuse_score
                .as_ref()
                .and_then(serde_json::Number::as_f64)
                .map_or(CellValue::Missing, CellValue::Number),
            "open_ports_details" => text(&record.open_ports_details),
            "security_recommendations" => match &record.security_recommendations {
                Some(list) => CellValue::Recommendations(list),
                None => CellValue::Missing,
            },
            "status" => CellValue::Text(&record.status),
            _ => CellValue::Missing,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Missing => 0,
            CellValue::Number(_) => 1,
            CellValue::Text(_) => 2,
            CellValue::Json(_) => 3,
            CellValue::Recommendations(_) => 4,
        }
    }

    /// Total order used by column sorting: missing < numbers < text < other JSON.
    ///
    /// Within a kind, numbers compare numerically, text lexicographically and JSON
    /// values by their serialized form. Recommendation lists all compare equal.
    pub fn compare(&self, other: &CellValue<'_>) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Json(a), CellValue::Json(b)) => a.to_string().cmp(&b.to_string()),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Display text; `None` when the field is absent.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Missing => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => Some((*s).to_string()),
            CellValue::Json(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            CellValue::Json(v) => Some(v.to_string()),
            CellValue::Recommendations(list) => Some(flatten_recommendations(list)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// `"<risk>: <details>"` per entry, joined with `"; "`.
pub fn flatten_recommendations(list: &[SecurityRecommendation]) -> String {
    list.iter()
        .map(|r| format!("{}: {}", r.risk, r.details))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field text for a column, `None` when absent.
pub fn cell_text(record: &LookupRecord, key: &str) -> Option<String> {
    CellValue::of(record, key).to_text()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Placeholder shown on screen for absent values.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub cells: Vec<String>,
    pub class: Option<RowClass>,
}

/// What the presenter hands to a rendering surface.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub mode: DisplayMode,
    pub columns: Vec<Column>,
    pub rows: Vec<RenderedRow>,
    pub export_available: bool,
    pub sorted_by: Option<(String, SortDirection)>,
}

/// Owner of the current result set.
///
/// Replaced wholesale by each completed batch and reordered in place by sorting.
#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: DisplayMode,
    records: Vec<LookupRecord>,
    directions: HashMap<&'static str, SortDirection>,
    last_sort: Option<(&'static str, SortDirection)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn records(&self) -> &[LookupRecord] {
        &self.records
    }

    pub fn columns(&self) -> &'static [Column] {
        columns_for(self.mode)
    }

    pub fn export_available(&self) -> bool {
        !self.records.is_empty()
    }

    /// Install a completed batch, discarding the previous set and its sort state.
    pub fn replace(&mut self, batch: Batch) -> RenderedTable {
        self.mode = batch.mode;
        self.records = batch.records;
        self.directions.clear();
        self.last_sort = None;
        self.render()
    }

    /// Header click on `key`: first click sorts ascending, later clicks alternate.
    pub fn sort_by(&mut self, key: &str) -> Result<RenderedTable, PipelineError> {
        let column = self
            .columns()
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| PipelineError::UnknownColumn(key.to_string()))?;

        let direction = match self.directions.get(column.key) {
            Some(d) => d.toggle(),
            None => SortDirection::Ascending,
        };
        self.directions.insert(column.key, direction);
        self.last_sort = Some((column.key, direction));

        sort_records(&mut self.records, column.key, direction);
        Ok(self.render())
    }

    pub fn render(&self) -> RenderedTable {
        let columns = self.columns();
        let rows = self
            .records
            .iter()
            .map(|record| RenderedRow {
                cells: columns
                    .iter()
                    .map(|c| cell_text(record, c.key).unwrap_or_else(|| PLACEHOLDER.to_string()))
                    .collect(),
                class: classify(&record.status),
            })
            .collect();
        RenderedTable {
            mode: self.mode,
            columns: columns.to_vec(),
            rows,
            export_available: self.export_available(),
            sorted_by: self.last_sort.map(|(k, d)| (k.to_string(), d)),
        }
    }
}

/// Columns holding lists; sorting by them leaves the current order untouched.
const UNORDERABLE_COLUMNS: &[&str] = &["security_recommendations"];

fn is_orderable(key: &str) -> bool {
    !UNORDERABLE_COLUMNS.contains(&key)
}

/// Stable sort of `records` by one field. A no-op for list-valued columns.
pub fn sort_records(records: &mut [LookupRecord], key: &str, direction: SortDirection) {
    if !is_orderable(key) {
        return;
    }
    records.sort_by(|a, b| {
        let ord = CellValue::of(a, key).compare(&CellValue::of(b, key));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ip: &str, score: Option<i64>, status: &str) -> LookupRecord {
        LookupRecord {
            ip: ip.into(),
            abuse_score: score.map(Into::into),
            status: status.into(),
            ..Default::default()
        }
    }

    fn ips(s: &Session) -> Vec<&str> {
        s.records().iter().map(|r| r.ip.as_str()).collect()
    }

    #[test]
    fn classification_precedence() {
        assert_eq!(classify("analyzed (cached)"), Some(RowClass::Analyzed));
        assert_eq!(classify("cached"), Some(RowClass::Cached));
        assert_eq!(classify("Erro: not found"), Some(RowClass::Error));
        assert_eq!(classify("analyzed | Erro: timeout"), Some(RowClass::Error));
        assert_eq!(classify("Erro: Unauthorized"), Some(RowClass::Error));
        assert_eq!(classify("error"), Some(RowClass::Error));
        assert_eq!(classify("Consultado"), None);
    }

    #[test]
    fn schemas_per_mode() {
        let ext: Vec<_> = columns_for(DisplayMode::External).iter().map(|c| c.key).collect();
        assert_eq!(
            ext,
            vec!["ip", "hostname", "country", "city", "open_ports", "abuse_score", "status"]
        );
        assert_eq!(columns_for(DisplayMode::Internal).len(), 4);
    }

    #[test]
    fn sort_toggles_and_is_stable() {
        let mut s = Session::new();
        s.replace(Batch {
            mode: DisplayMode::External,
            records: vec![
                rec("a", Some(10), "Consultado"),
                rec("b", Some(0), "Consultado"),
                rec("c", Some(10), "Consultado"),
                rec("d", None, "Erro: x"),
            ],
        });

        let t = s.sort_by("abuse_score").unwrap();
        assert_eq!(ips(&s), vec!["d", "b", "a", "c"]);
        assert_eq!(t.sorted_by, Some(("abuse_score".into(), SortDirection::Ascending)));

        s.sort_by("abuse_score").unwrap();
        assert_eq!(ips(&s), vec!["a", "c", "b", "d"]);

        s.sort_by("abuse_score").unwrap();
        assert_eq!(ips(&s), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn directions_tracked_per_column() {
        let mut s = Session::new();
        s.replace(Batch {
            mode: DisplayMode::External,
            records: vec![rec("b", Some(1), "x"), rec("a", Some(2), "y")],
        });
        s.sort_by("ip").unwrap();
        assert_eq!(ips(&s), vec!["a", "b"]);
        // First click on another column starts ascending regardless of `ip`'s state.
        s.sort_by("abuse_score").unwrap();
        assert_eq!(ips(&s), vec!["b", "a"]);
        s.sort_by("ip").unwrap();
        assert_eq!(ips(&s), vec!["b", "a"]);
    }

    #[test]
    fn recommendation_column_sort_is_noop() {
        let mk = |ip: &str, risk: &str| LookupRecord {
            ip: ip.into(),
            security_recommendations: Some(vec![SecurityRecommendation {
                risk: risk.into(),
                details: "d".into(),
            }]),
            status: "analyzed (internal)".into(),
            ..Default::default()
        };
        let mut s = Session::new();
        s.replace(Batch {
            mode: DisplayMode::Internal,
            records: vec![mk("z", "LOW"), mk("a", "HIGH"), mk("m", "MEDIUM")],
        });
        s.sort_by("security_recommendations").unwrap();
        assert_eq!(ips(&s), vec!["z", "a", "m"]);
        s.sort_by("security_recommendations").unwrap();
        assert_eq!(ips(&s), vec!["z", "a", "m"]);
    }

    #[test]
    fn mixed_kind_port_column_sorts_without_panicking() {
        let records: Vec<LookupRecord> = (0..60)
            .map(|i| LookupRecord {
                ip: format!("10.0.0.{i}"),
                open_ports: match i % 4 {
                    0 => None,
                    1 => Some(serde_json::json!([i, 443])),
                    2 => Some(serde_json::json!(format!("{}-{}", 100 - i, i))),
                    _ => Some(serde_json::json!(i * 7 % 50)),
                },
                status: "Consultado".into(),
                ..Default::default()
            })
            .collect();
        let mut s = Session::new();
        s.replace(Batch { mode: DisplayMode::External, records });

        let kinds = |s: &Session| -> Vec<u8> {
            s.records()
                .iter()
                .map(|r| CellValue::of(r, "open_ports").rank())
                .collect()
        };

        s.sort_by("open_ports").unwrap();
        let asc = kinds(&s);
        assert!(asc.windows(2).all(|w| w[0] <= w[1]));
        let pairs: Vec<_> = s.records().iter().map(|r| CellValue::of(r, "open_ports")).collect();
        assert!(pairs
            .windows(2)
            .all(|w| w[0].compare(&w[1]) != Ordering::Greater));

        s.sort_by("open_ports").unwrap();
        let desc = kinds(&s);
        assert!(desc.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(s.records().len(), 60);
    }

    #[test]
    fn unknown_or_hidden_column_is_rejected() {
        let mut s = Session::new();
        s.replace(Batch {
            mode: DisplayMode::Internal,
            records: vec![rec("a", None, "x")],
        });
        assert!(matches!(s.sort_by("hostname"), Err(PipelineError::UnknownColumn(_))));
    }

    #[test]
    fn render_uses_placeholder_and_classes() {
        let mut s = Session::new();
        assert!(!s.render().export_available);
        let t = s.replace(Batch {
            mode: DisplayMode::External,
            records: vec![LookupRecord {
                ip: "9.9.9.9".into(),
                open_ports: Some(serde_json::json!([53, 443])),
                abuse_score: Some(0.into()),
                status: "analyzed (cached)".into(),
                ..Default::default()
            }],
        });
        assert!(t.export_available);
        let row = &t.rows[0];
        assert_eq!(row.cells, vec!["9.9.9.9", "N/A", "N/A", "N/A", "53, 443", "0", "analyzed (cached)"]);
        assert_eq!(row.class, Some(RowClass::Analyzed));
    }

    #[test]
    fn replacing_with_other_mode_drops_old_columns() {
        let mut s = Session::new();
        s.replace(Batch { mode: DisplayMode::External, records: vec![rec("a", None, "x")] });
        let t = s.replace(Batch { mode: DisplayMode::Internal, records: vec![rec("a", None, "x")] });
        let keys: Vec<_> = t.columns.iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["ip", "open_ports_details", "security_recommendations", "status"]);
        assert_eq!(t.rows[0].cells.len(), 4);
    }
}
