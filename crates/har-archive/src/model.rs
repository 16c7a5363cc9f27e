//! Serde model of the subset of HAR 1.2 we read
//!
//! Every field is optional or defaulted: browser exports routinely omit
//! fields, send `null`, or use `-1` for unknown numbers.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HarFile {
    #[serde(default)]
    pub log: Option<HarLog>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HarLog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HarEntry {
    #[serde(default)]
    pub started_date_time: Option<String>,
    /// Total elapsed milliseconds, -1 when unknown
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request: HarRequest,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: HarResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HarRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Vec<HarHeader>,
    #[serde(default)]
    pub post_data: Option<HarPostData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HarResponse {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Vec<HarHeader>,
    #[serde(default)]
    pub content: Option<HarContent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HarHeader {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HarPostData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HarContent {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
