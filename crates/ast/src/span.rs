use serde_json::Value;

/// Byte-offset location of a node in the original source, plus the id of the
/// source unit it was parsed from ("contract id" in solc's `src` triples).
///
/// Synthetic nodes produced by the builders in [`crate::builders`] carry the
/// all-zero sentinel [`SourceSpan::SYNTHETIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
    pub contract_id: i32,
}

impl SourceSpan {
    pub const SYNTHETIC: SourceSpan = SourceSpan { start: 0, end: 0, contract_id: -1 };

    /// Parse solc's `"start:length:contractId"` triple. Falls back to
    /// [`SourceSpan::SYNTHETIC`] for anything malformed rather than failing
    /// ingestion outright -- a missing/bad `src` field shouldn't block
    /// reading an otherwise-valid node.
    pub fn parse(value: Option<&Value>) -> SourceSpan {
        let Some(Value::String(s)) = value else { return SourceSpan::SYNTHETIC };
        let parts: Vec<i64> = s.split(':').filter_map(|p| p.parse().ok()).collect();
        let [start, len, contract_id] = parts[..] else { return SourceSpan::SYNTHETIC };
        SourceSpan { start: start as u32, end: (start + len) as u32, contract_id: contract_id as i32 }
    }
}
