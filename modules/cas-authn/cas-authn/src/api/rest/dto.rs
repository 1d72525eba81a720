use serde::Deserialize;

/// Query of a proxy callback: `?pgtIou=<iou>&pgtId=<pgt>`.
///
/// CAS servers probe the callback URL without parameters before using it,
/// so both fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyCallbackQuery {
    #[serde(rename = "pgtIou")]
    pub pgt_iou: Option<String>,
    #[serde(rename = "pgtId")]
    pub pgt_id: Option<String>,
}

impl ProxyCallbackQuery {
    /// Both values, when present and non-blank.
    #[must_use]
    pub fn pair(&self) -> Option<(&str, &str)> {
        let iou = self.pgt_iou.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let pgt = self.pgt_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((iou, pgt))
    }
}
