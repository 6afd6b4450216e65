//! HTTP request handling for the glyph CSV service.
//!
//! `FontService` maps a method and request URL to a `Reply`. It knows
//! nothing about sockets; `http` feeds it requests from `tiny_http`.
//!
//! Routes:
//! - `GET /` status payload
//! - `GET /font.csv?text=..&size=..` glyph bitmaps as a CSV attachment
//! - `GET /clear` empties the glyph cache

pub mod http;


use crate::cache::GlyphCache;
use crate::config::SizeCatalog;
use crate::csv_encoder;
use crate::rasterizer::GlyphSource;
use log::*;
use serde::Serialize;
use tiny_http::Method;

pub const USAGE_HINT: &str = "/font.csv?text=你好&size=16";

const JSON: &str = "application/json";
const CSV: &str = "text/csv; charset=utf-8";

/// A fully built HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_vec(payload) {
            Ok(body) => Reply::new(status, JSON, body),
            Err(e) => {
                error!("FontService: Failed to serialize JSON reply: {}", e);
                Reply::new(500, JSON, br#"{"detail":"Internal Server Error"}"#.to_vec())
            }
        }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        Reply::json(
            status,
            &ErrorBody {
                detail: detail.into(),
            },
        )
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// First value of header `name`, case-insensitive.
    #[cfg(test)]
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'static str,
    usage: &'static str,
    supported_sizes: &'a [u32],
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Parameters of a `/font.csv` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontQuery {
    pub text: String,
    pub size: Option<i64>,
}

/// Why a query string could not become a `FontQuery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    MissingText,
    InvalidSize(String),
}

impl FontQuery {
    /// Parse an `application/x-www-form-urlencoded` query. Repeated keys:
    /// the last value wins.
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let mut text = None;
        let mut size = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "text" => text = Some(value.into_owned()),
                "size" => size = Some(value.into_owned()),
                _ => {}
            }
        }

        let text = text.ok_or(QueryError::MissingText)?;
        let size = match size {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(size) => Some(size),
                Err(_) => return Err(QueryError::InvalidSize(raw)),
            },
            None => None,
        };
        Ok(FontQuery { text, size })
    }
}

/// Routes requests to the glyph cache and CSV encoder.
pub struct FontService<S: GlyphSource> {
    cache: GlyphCache<S>,
    sizes: SizeCatalog,
}

impl<S: GlyphSource> FontService<S> {
    pub fn new(cache: GlyphCache<S>, sizes: SizeCatalog) -> Self {
        Self { cache, sizes }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &GlyphCache<S> {
        &self.cache
    }

    /// Answer one request. `url` is the request target, path plus query.
    pub fn handle(&self, method: &Method, url: &str) -> Reply {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let reply = match (method, path) {
            (Method::Get, "/") => self.status(),
            (Method::Get, "/font.csv") => self.font_csv(query),
            (Method::Get, "/clear") => self.clear(),
            (_, "/") | (_, "/font.csv") | (_, "/clear") => {
                Reply::error(405, "Method Not Allowed")
            }
            _ => Reply::error(404, "Not Found"),
        };
        info!("FontService: {} {} -> {}", method, path, reply.status);
        reply
    }

    fn status(&self) -> Reply {
        Reply::json(
            200,
            &StatusBody {
                status: "online",
                usage: USAGE_HINT,
                supported_sizes: self.sizes.sizes(),
            },
        )
    }

    fn font_csv(&self, query: &str) -> Reply {
        let query = match FontQuery::parse(query) {
            Ok(query) => query,
            Err(QueryError::MissingText) => {
                return Reply::error(422, "Query parameter 'text' is required")
            }
            Err(QueryError::InvalidSize(raw)) => {
                return Reply::error(
                    422,
                    format!("Query parameter 'size' must be an integer, got {:?}", raw),
                )
            }
        };
        if query.text.is_empty() {
            return Reply::error(400, "Text cannot be empty");
        }

        let size = self.sizes.coerce(query.size);
        if query.size.is_some_and(|requested| requested != i64::from(size)) {
            debug!(
                "FontService: Unsupported size {:?}, using {}px",
                query.size, size
            );
        }

        let rendered = self.cache.ensure(&query.text, size);
        debug!(
            "FontService: {} char(s) at {}px, {} newly rendered, {} cached",
            query.text.chars().count(),
            size,
            rendered,
            self.cache.len()
        );

        match csv_encoder::encode(&query.text, size, &self.cache) {
            Ok(body) => Reply::new(200, CSV, body.into_bytes())
                .with_header(
                    "Content-Disposition",
                    format!("attachment; filename=font_{}.csv", size),
                )
                .with_header("Cache-Control", "no-cache"),
            Err(e) => {
                error!("FontService: CSV encoding failed: {:#}", e);
                Reply::error(500, "Internal Server Error")
            }
        }
    }

    fn clear(&self) -> Reply {
        self.cache.clear();
        Reply::json(
            200,
            &MessageBody {
                message: "Cache cleared",
            },
        )
    }
}
