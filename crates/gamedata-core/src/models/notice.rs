use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::decode::{optional, required, Decode, Schema};
use crate::error::{ContentNotFoundError, Error, Result, ValidationError};

/// Timestamp format used by the announcement API
const NOTICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One game announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub subtitle: String,
    pub banner: Option<String>,
    /// HTML body as served by the API.
    pub content: String,
    pub type_label: String,
    pub tag_label: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    /// English title, when the feed language is not English.
    pub en_title: Option<String>,
}

impl Notice {
    pub fn is_active(&self, now: DateTime<FixedOffset>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    /// The body with tags removed and common entities decoded.
    pub fn plain_content(&self) -> String {
        strip_html(&self.content)
    }
}

fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// API response types
// ============================================================================

/// `{retcode, message, data}` wrapper around every announcement response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub retcode: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T: Decode> Decode for ApiEnvelope<T> {
    fn schema() -> Schema {
        Schema::object([
            required("retcode", Schema::Integer),
            optional("message", Schema::String),
            optional("data", Schema::nullable(T::schema())),
        ])
    }
}

impl<T> ApiEnvelope<T> {
    pub(crate) fn into_data(self) -> Result<T> {
        if self.retcode != 0 {
            return Err(Error::Remote {
                retcode: self.retcode,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| ValidationError::new("$.data", "object", "null").into())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAnnContentData {
    pub list: Vec<ApiAnnContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAnnContent {
    pub ann_id: u64,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub content: String,
}

impl Decode for ApiAnnContentData {
    fn schema() -> Schema {
        Schema::object([required(
            "list",
            Schema::array(Schema::object([
                required("ann_id", Schema::Unsigned),
                required("title", Schema::String),
                optional("subtitle", Schema::String),
                optional("banner", Schema::String),
                optional("content", Schema::String),
            ])),
        )])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAnnListData {
    pub list: Vec<ApiAnnGroup>,
    /// Hours east of UTC that `start_time`/`end_time` are expressed in.
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAnnGroup {
    pub list: Vec<ApiAnnListItem>,
    #[serde(default)]
    pub type_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiAnnListItem {
    pub ann_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub tag_label: String,
    pub start_time: String,
    pub end_time: String,
}

impl Decode for ApiAnnListData {
    fn schema() -> Schema {
        Schema::object([
            required(
                "list",
                Schema::array(Schema::object([
                    required(
                        "list",
                        Schema::array(Schema::object([
                            required("ann_id", Schema::Unsigned),
                            optional("title", Schema::String),
                            optional("subtitle", Schema::String),
                            optional("banner", Schema::String),
                            optional("tag_label", Schema::String),
                            required("start_time", Schema::String),
                            required("end_time", Schema::String),
                        ])),
                    ),
                    optional("type_label", Schema::String),
                ])),
            ),
            optional("timezone", Schema::I32),
        ])
    }
}

fn parse_time(raw: &str, offset: FixedOffset, path: String) -> Result<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, NOTICE_TIME_FORMAT)
        .ok()
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| {
            ValidationError::new(path, "time as YYYY-MM-DD HH:MM:SS", format!("string {:?}", raw)).into()
        })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Join the summary list with its detail content. Every listed id must have
/// content in `contents`; English content is optional per notice.
pub(crate) fn build_notices(
    list: &ApiAnnListData,
    contents: &ApiAnnContentData,
    en_contents: Option<&ApiAnnContentData>,
) -> Result<Vec<Notice>> {
    let offset = list
        .timezone
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ValidationError::new(
                "$.data.timezone",
                "UTC offset in hours",
                format!("integer {}", list.timezone),
            )
        })?;

    let mut notices = Vec::new();
    for (g, group) in list.list.iter().enumerate() {
        for (i, item) in group.list.iter().enumerate() {
            let path = format!("$.data.list[{}].list[{}]", g, i);
            let content = contents
                .list
                .iter()
                .find(|c| c.ann_id == item.ann_id)
                .ok_or_else(|| ContentNotFoundError::new(item.ann_id))?;
            let en_title = en_contents
                .and_then(|en| en.list.iter().find(|c| c.ann_id == item.ann_id))
                .map(|c| c.title.clone());

            notices.push(Notice {
                id: item.ann_id,
                title: non_empty(&content.title).unwrap_or_else(|| item.title.clone()),
                subtitle: non_empty(&content.subtitle).unwrap_or_else(|| item.subtitle.clone()),
                banner: non_empty(&content.banner).or_else(|| non_empty(&item.banner)),
                content: content.content.clone(),
                type_label: group.type_label.clone(),
                tag_label: item.tag_label.clone(),
                start_time: parse_time(&item.start_time, offset, format!("{}.start_time", path))?,
                end_time: parse_time(&item.end_time, offset, format!("{}.end_time", path))?,
                en_title,
            });
        }
    }
    Ok(notices)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// annList payload with one group listing `ids`.
    pub fn ann_list(ids: &[u64]) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"ann_id": {id}, "title": "List {id}", "subtitle": "Sub {id}", "banner": "",
                        "tag_label": "Event", "type_label": "Game",
                        "start_time": "2024-03-01 10:00:00", "end_time": "2024-04-01 03:59:59"}}"#
                )
            })
            .collect();
        format!(
            r#"{{"retcode": 0, "message": "OK", "data": {{"list": [{{"list": [{}], "type_id": 2, "type_label": "Game"}}], "total": {}, "timezone": 8}}}}"#,
            items.join(","),
            ids.len()
        )
    }

    /// annContent payload with `ids`, titles prefixed by `prefix`.
    pub fn ann_content(ids: &[u64], prefix: &str) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"ann_id": {id}, "title": "{prefix} {id}", "subtitle": "", "banner": "https://example.test/{id}.jpg",
                        "content": "<p>Body&nbsp;{id}</p>", "lang": "x"}}"#
                )
            })
            .collect();
        format!(
            r#"{{"retcode": 0, "message": "OK", "data": {{"list": [{}], "total": {}}}}}"#,
            items.join(","),
            ids.len()
        )
    }
}
