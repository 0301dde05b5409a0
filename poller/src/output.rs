use color_eyre::Result;
use eyre::{
    bail,
    Context as _,
};
use livetrack_obs_template::RenderedOutput;
use std::{
    future::Future,
    path::{
        Path,
        PathBuf,
    },
    pin::Pin,
};

/// Name of the file holding the raw provider payload.
pub const TRACKPOINTS_FILE: &str = "trackpoints.json";

/// Destination of everything a poll produces.
pub trait OutputSink: Send + Sync {
    /// Write `value` as pretty printed JSON under `name`.
    fn write_json<'a>(
        &'a self,
        name: &'a str,
        value: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

    /// Write one file per rendered leaf.
    fn write_rendered<'a>(
        &'a self,
        rendered: &'a RenderedOutput,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>>;
}

/// Writes into a folder on disk.
///
/// Each leaf lands in `<key>.txt`, nested groups become sub-folders, so
/// `fitnessPointData.distanceInMiles` is `fitnessPointData/distanceInMiles.txt`.
#[derive(Debug, Clone)]
pub struct FileOutput {
    folder: PathBuf,
}

impl FileOutput {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self { folder: folder.into() }
    }

    /// Path of the leaf reached through `keys`.
    pub fn leaf_path(&self, keys: &[&str]) -> Result<PathBuf> {
        let mut path = self.folder.clone();
        let Some((file, dirs)) = keys.split_last() else {
            bail!("rendered output has an empty key path");
        };
        for dir in dirs {
            path.push(checked_component(dir)?);
        }
        path.push(format!("{}.txt", checked_component(file)?));
        Ok(path)
    }
}

/// Keys become path components, so they must not walk out of the folder.
fn checked_component(key: &str) -> Result<&str> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        bail!("template key {key:?} cannot be used as a file name");
    }
    Ok(key)
}

async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

impl OutputSink for FileOutput {
    fn write_json<'a>(
        &'a self,
        name: &'a str,
        value: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.folder.join(checked_component(name)?);
            let json = serde_json::to_string_pretty(value)?;
            write_file(&path, json).await?;
            trace!(path = %path.display(), "Wrote JSON");
            Ok(path)
        })
    }

    fn write_rendered<'a>(
        &'a self,
        rendered: &'a RenderedOutput,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>> {
        Box::pin(async move {
            let mut written = Vec::new();
            for (keys, text) in rendered.leaves() {
                let path = self.leaf_path(&keys)?;
                write_file(&path, text).await?;
                written.push(path);
            }
            trace!(count = written.len(), "Wrote rendered templates");
            Ok(written)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livetrack_obs_template::{
        render,
        TemplateSpec,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use temp_dir::TempDir;

    fn rendered() -> RenderedOutput {
        let spec = TemplateSpec::new()
            .with_template("gps", "${position.lat},${position.lon}")
            .with_nested(
                "fitnessPointData",
                TemplateSpec::new().with_template("distanceInMiles", "${round(distanceMeters / 1609.34)}"),
            );
        let record = json!({
            "position": {"lat": 1, "lon": 2},
            "fitnessPointData": {"distanceMeters": 3218.68}
        });
        render(&spec, Some(&record)).unwrap()
    }

    #[tokio::test]
    async fn writes_leaves_into_nested_folders() {
        let dir = TempDir::new().unwrap();
        let output = FileOutput::new(dir.child("stats"));
        let rendered = rendered();

        let written = output.write_rendered(&rendered).await.unwrap();

        assert_eq!(written.len(), rendered.leaves().len());
        assert_eq!(
            std::fs::read_to_string(dir.child("stats/gps.txt")).unwrap(),
            "1,2"
        );
        assert_eq!(
            std::fs::read_to_string(dir.child("stats/fitnessPointData/distanceInMiles.txt")).unwrap(),
            "2"
        );
    }

    #[tokio::test]
    async fn writes_pretty_json() {
        let dir = TempDir::new().unwrap();
        let output = FileOutput::new(dir.path());
        let payload = json!({"trackPoints": [{"speed": 1}]});

        let path = output.write_json(TRACKPOINTS_FILE, &payload).await.unwrap();

        assert_eq!(path, dir.child(TRACKPOINTS_FILE));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&written).unwrap(), payload);
    }

    #[tokio::test]
    async fn overwrites_previous_values() {
        let dir = TempDir::new().unwrap();
        let output = FileOutput::new(dir.path());
        let spec = TemplateSpec::new().with_template("speed", "${speed}");

        output
            .write_rendered(&render(&spec, Some(&json!({"speed": 10}))).unwrap())
            .await
            .unwrap();
        output
            .write_rendered(&render(&spec, Some(&json!({"speed": 3}))).unwrap())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dir.child("speed.txt")).unwrap(), "3");
    }

    #[test]
    fn rejects_keys_that_escape_the_folder() {
        let output = FileOutput::new("/tmp/stats");
        assert!(output.leaf_path(&["..", "x"]).is_err());
        assert!(output.leaf_path(&["a/b"]).is_err());
        assert!(output.leaf_path(&[]).is_err());
        assert_eq!(
            output.leaf_path(&["fitnessPointData", "durationInHhmm"]).unwrap(),
            PathBuf::from("/tmp/stats/fitnessPointData/durationInHhmm.txt")
        );
    }
}
