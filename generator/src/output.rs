use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Error;
use crate::generators::Artifact;

/// Writes every artifact to `<out_dir>/<namespace_dir>/<file name>`, creating directories as
/// needed. Returns the written paths in artifact order.
pub fn write_artifacts(
    out_dir: &Path,
    namespace_dir: &Path,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, Error> {
    let dir = out_dir.join(namespace_dir);
    std::fs::create_dir_all(&dir).map_err(|source| Error::Write {
        path: dir.display().to_string(),
        source,
    })?;
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.source).map_err(|source| Error::Write {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), kind = ?artifact.kind, "wrote artifact");
        written.push(path);
    }
    Ok(written)
}

/// Prints all artifacts one after the other, each preceded by a comment naming its file.
pub fn print_artifacts(mut writer: impl Write, artifacts: &[Artifact]) -> std::io::Result<()> {
    for (index, artifact) in artifacts.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "// {}", artifact.file_name)?;
        writer.write_all(artifact.source.as_bytes())?;
    }
    writer.flush()
}
