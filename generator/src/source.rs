use std::path::Path;

use tracing::debug;

use crate::error::Error;

/// Where a service description comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    File(&'a Path),
    Url(&'a str),
}

impl<'a> Input<'a> {
    pub fn parse(input: &'a str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input)
        } else {
            Self::File(Path::new(input))
        }
    }

    pub fn read(&self) -> Result<String, Error> {
        match *self {
            Self::File(path) => {
                debug!(path = %path.display(), "reading service description");
                std::fs::read_to_string(path).map_err(|source| Error::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
            Self::Url(url) => {
                debug!(%url, "fetching service description");
                let fetch_error = |source| Error::Fetch {
                    url: url.to_string(),
                    source,
                };
                reqwest::blocking::get(url)
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.text())
                    .map_err(fetch_error)
            }
        }
    }

    /// Service name used when neither the command line nor the file names one.
    pub fn fallback_service_name(&self) -> Option<String> {
        let stem = match *self {
            Self::File(path) => path.file_stem()?.to_str()?,
            Self::Url(url) => {
                let last = url.trim_end_matches('/').rsplit('/').next()?;
                let last = last.split(['?', '#']).next()?;
                last.rsplit_once('.').map_or(last, |(stem, _)| stem)
            }
        };
        (!stem.is_empty()).then(|| stem.to_string())
    }
}
