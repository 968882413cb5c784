use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use gallery_store::models::{NewProfile, NewProfileImage};

/// One profile and the posts that belong to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileFixture {
    pub profile: NewProfile,
    #[serde(default)]
    pub posts: Vec<NewProfileImage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureDocument {
    Many(Vec<ProfileFixture>),
    One(ProfileFixture),
}

/// Parses a document holding either a single fixture or an array of them.
pub fn parse_fixtures(bytes: &[u8]) -> anyhow::Result<Vec<ProfileFixture>> {
    let document: FixtureDocument = serde_json::from_slice(bytes)?;
    Ok(match document {
        FixtureDocument::Many(fixtures) => fixtures,
        FixtureDocument::One(fixture) => vec![fixture],
    })
}

/// Raw fixture document plus where it came from, for log lines.
#[derive(Debug, Clone)]
pub struct Document {
    pub origin: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Dir(PathBuf),
    Url(reqwest::Url),
}

impl Source {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = reqwest::Url::parse(raw).with_context(|| format!("invalid url {raw}"))?;
            return Ok(Source::Url(url));
        }

        let path = PathBuf::from(raw);
        let meta = std::fs::metadata(&path).with_context(|| format!("cannot read {}", path.display()))?;
        Ok(if meta.is_dir() { Source::Dir(path) } else { Source::File(path) })
    }

    /// Reads every document of the source. A directory yields its `*.json`
    /// files in name order; other entries are ignored.
    pub async fn load(&self, client: &reqwest::Client) -> anyhow::Result<Vec<Document>> {
        match self {
            Source::File(path) => Ok(vec![read_file(path).await?]),
            Source::Dir(dir) => {
                let mut paths = Vec::new();
                let mut entries = tokio::fs::read_dir(dir)
                    .await
                    .with_context(|| format!("cannot list {}", dir.display()))?;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                        paths.push(path);
                    }
                }
                paths.sort();

                let mut documents = Vec::with_capacity(paths.len());
                for path in paths {
                    documents.push(read_file(&path).await?);
                }
                Ok(documents)
            }
            Source::Url(url) => {
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("fetching {url}"))?
                    .error_for_status()?;
                let bytes = response.bytes().await?;
                Ok(vec![Document {
                    origin: url.to_string(),
                    bytes: bytes.to_vec(),
                }])
            }
        }
    }
}

async fn read_file(path: &Path) -> anyhow::Result<Document> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Document {
        origin: path.display().to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_single_fixture() {
        let fixtures = parse_fixtures(
            br#"{"profile": {"id": "ana", "name": "Ana"}, "posts": [{"imageUrl": "https://cdn.test/1.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].profile.id.as_deref(), Some("ana"));
        assert_eq!(fixtures[0].posts.len(), 1);
    }

    #[test]
    fn parses_array_and_missing_posts() {
        let fixtures = parse_fixtures(
            br#"[{"profile": {"name": "One"}}, {"profile": {"name": "Two", "tags": ["a"]}, "posts": []}]"#,
        )
        .unwrap();
        assert_eq!(fixtures.len(), 2);
        assert!(fixtures[0].posts.is_empty());
        assert_eq!(fixtures[1].profile.tags, vec!["a".to_string()]);
    }

    #[test]
    fn rejects_documents_without_profile() {
        assert!(parse_fixtures(br#"{"posts": []}"#).is_err());
        assert!(parse_fixtures(b"not json").is_err());
    }

    #[test]
    fn source_kinds() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, "{}").unwrap();

        assert_eq!(Source::parse(dir.path().to_str().unwrap()).unwrap(), Source::Dir(dir.path().to_path_buf()));
        assert_eq!(Source::parse(file.to_str().unwrap()).unwrap(), Source::File(file.clone()));
        assert!(matches!(Source::parse("https://example.com/seed.json").unwrap(), Source::Url(_)));
        assert!(Source::parse(dir.path().join("missing.json").to_str().unwrap()).is_err());
    }

    #[tokio::test]
    async fn directory_loads_json_files_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a.JSON"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let documents = Source::Dir(dir.path().to_path_buf())
            .load(&reqwest::Client::new())
            .await
            .unwrap();
        let names: Vec<_> = documents
            .iter()
            .map(|d| Path::new(&d.origin).file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }
}
