//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Base path and key layout helpers
//!
//! Directory-style stores (ZooKeeper, etcd v2) list one level at a time and
//! return bare child names. Flat stores (Consul KV, etcd v3) return full keys,
//! so the service name has to be recovered from each leaf key.

use crate::error::{RegistryError, RegistryResult};
use std::collections::BTreeSet;
use url::Url;

/// How a backend lays out and lists its keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// Hierarchical listing, child names are single path segments
    Directory,
    /// Prefix listing over full keys
    Flat,
}

/// Normalize a configured base path for the given layout.
///
/// One leading `/` is stripped. Directory layouts also lose one trailing `/`;
/// flat layouts end with exactly one `/` so prefix listings stay inside the
/// base. An empty base addresses the whole keyspace.
pub fn normalize_base_path(raw: &str, layout: KeyLayout) -> String {
    let path = raw.strip_prefix('/').unwrap_or(raw);
    match layout {
        KeyLayout::Directory => path.strip_suffix('/').unwrap_or(path).to_string(),
        KeyLayout::Flat => {
            if path.is_empty() || path.ends_with('/') {
                path.to_string()
            } else {
                format!("{}/", path)
            }
        }
    }
}

/// Join path segments with `/`, skipping empty segments
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Full key of a leaf under a flat prefix that already ends with `/`
pub fn flat_key(prefix: &str, name: &str, address: &str) -> String {
    format!("{}{}/{}", prefix, name, address)
}

/// Last segment of a `/`-separated key, ignoring a trailing `/`
pub fn last_segment(key: &str) -> &str {
    let key = key.strip_suffix('/').unwrap_or(key);
    key.rsplit('/').next().unwrap_or(key)
}

/// Distinct branch names found in a flat key listing.
///
/// A key contributes the first segment below `prefix` only when something
/// follows it; keys outside the prefix or directly under it are ignored.
pub fn flat_branches<'a, I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .filter_map(|key| {
            let (branch, _) = key.strip_prefix(prefix)?.split_once('/')?;
            (!branch.is_empty()).then(|| branch.to_string())
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Split a flat leaf key into `(name, address)`.
///
/// The name is everything between `prefix` and the last `/`, the address is
/// everything after it. Keys outside the prefix, folder keys and keys sitting
/// directly under the prefix yield `None`.
pub fn split_leaf_key(prefix: &str, key: &str) -> Option<(String, String)> {
    let relative = key.strip_prefix(prefix)?;
    let (name, address) = relative.rsplit_once('/')?;
    if name.is_empty() || address.is_empty() {
        return None;
    }
    Some((name.to_string(), address.to_string()))
}

/// Turn a configured registry URL into an HTTP base URL.
///
/// Accepts `host:port`, a full URL, or a comma-separated list (first entry wins).
pub fn http_endpoint(registry_url: &str) -> String {
    let endpoint = registry_url
        .split(',')
        .map(str::trim)
        .find(|e| !e.is_empty())
        .unwrap_or("");
    let endpoint = endpoint.trim_end_matches('/');

    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// Append path segments to an HTTP endpoint, percent-encoding each one.
///
/// A segment never spills into the query or fragment, so `?`, `#`, `%` and
/// `/` inside a name or address stay part of that segment.
pub fn segment_url<'a, I>(endpoint: &str, segments: I) -> RegistryResult<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = Url::parse(endpoint)
        .map_err(|e| RegistryError::Configuration(format!("invalid endpoint {}: {}", endpoint, e)))?;
    url.path_segments_mut()
        .map_err(|_| {
            RegistryError::Configuration(format!("endpoint {} cannot carry a path", endpoint))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Split a registry URL into individual endpoints
pub fn endpoints(registry_url: &str) -> Vec<String> {
    registry_url
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
