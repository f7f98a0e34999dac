//! Serving files from a directory.
//!
//! [`StaticFiles`] is a [`Handler`] meant to be mounted under a catch-all
//! route; [`Group::static_dir`](crate::server::Group::static_dir) does that
//! for you. The `filepath` parameter is mapped onto the base directory, and
//! anything that would climb out of it is refused.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::context::Context;
use crate::handler::Handler;

/// Name of the catch-all parameter static routes are mounted with.
pub const FILEPATH_PARAM: &str = "filepath";

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }

    /// Read the file at `url_path` relative to the base directory.
    ///
    /// # Errors
    ///
    /// `NotFound` for traversal attempts, directories and missing files;
    /// any other I/O error from reading.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl Handler for StaticFiles {
    fn handle(&self, ctx: &mut Context) {
        let file = ctx.param(FILEPATH_PARAM).unwrap_or_default().to_string();
        match self.load(&file) {
            Ok((bytes, content_type)) => ctx.data(200, content_type, bytes),
            Err(e) => {
                debug!(file = %file, error = %e, "Static file not served");
                ctx.fail(404, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_path_prevents_traversal() {
        let sf = StaticFiles::new("tests/staticdata");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("css/../../Cargo.toml").is_none());
        assert!(sf.map_path("/etc/passwd").is_some());
        assert_eq!(
            sf.map_path("./css/site.css"),
            Some(PathBuf::from("tests/staticdata/css/site.css"))
        );
    }

    #[test]
    fn test_load_plain_file() {
        let sf = StaticFiles::new("tests/staticdata");
        let (bytes, ct) = sf.load("hello.txt").unwrap();
        assert_eq!(ct, "text/plain");
        assert_eq!(String::from_utf8(bytes).unwrap(), "Hello\n");
    }

    #[test]
    fn test_directory_is_not_served() {
        let sf = StaticFiles::new("tests/staticdata");
        let err = sf.load("css").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(StaticFiles::content_type(Path::new("a.CSS")), "text/css");
        assert_eq!(StaticFiles::content_type(Path::new("a.js")), "application/javascript");
        assert_eq!(StaticFiles::content_type(Path::new("noext")), "application/octet-stream");
    }
}
