//! Target list loading.
//!
//! The input file holds one target per line, either CIDR notation or a plain
//! address. Lines are never rejected: anything unparseable becomes an
//! invalid target that scans as closed.

use crate::error::{InputError, InputResult};
use crate::types::{PortSet, Target};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Build one target per line, all sharing `ports`.
pub fn targets_from_lines<I, S>(lines: I, ports: &PortSet) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| {
            let target = Target::from_line(line.as_ref(), Arc::clone(ports));
            debug!(%target, range = target.is_range(), "loaded target");
            target
        })
        .collect()
}

/// Read the input file at `path` into a target list.
pub async fn read_targets(path: &Path, ports: &PortSet) -> InputResult<Vec<Target>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InputError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(targets_from_lines(content.lines(), ports))
}
