use crate::config::{Config, SitePaths, TEMPLATE_EXTENSION};
use crate::document::read_template_file;
use crate::error::{IoContext, Result, SitegenError};
use crate::types::Post;
use futures_util::future::try_join_all;
use log::info;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Reads every `<posts>/<name>/index.tera` and orders them oldest first.
///
/// The first unreadable or malformed post aborts the whole collection.
pub async fn collect_posts(config: &Config) -> Result<Vec<Post>> {
    let paths = &config.paths;
    let files = discover_posts(&paths.posts_dir).await?;
    let root = href_root(paths);

    let mut posts = try_join_all(
        files
            .iter()
            .map(|file| read_template_file(file, root)),
    )
    .await?;

    posts.sort_by(compare_mtime);

    info!("Collected {} posts", posts.len());

    Ok(posts)
}

/// Total order on post timestamps; `sort_by` keeps equal posts in
/// discovery order.
pub fn compare_mtime(a: &Post, b: &Post) -> Ordering {
    a.mtime.cmp(&b.mtime)
}

/// Posts kept outside the input tree are linked as if their directory sat
/// directly under it.
fn href_root(paths: &SitePaths) -> &Path {
    if paths.posts_dir.starts_with(&paths.indir) {
        paths.indir.as_path()
    } else {
        paths.posts_dir.parent().unwrap_or(paths.posts_dir.as_path())
    }
}

async fn discover_posts(posts_dir: &Path) -> Result<Vec<PathBuf>> {
    let exists = tokio::fs::try_exists(posts_dir)
        .await
        .io_context("checking posts directory", posts_dir)?;
    if !exists {
        return Ok(Vec::new());
    }

    let index_name = format!("index.{TEMPLATE_EXTENSION}");
    let mut files = Vec::new();

    for entry in WalkDir::new(posts_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|error| SitegenError::WalkDir {
            path: posts_dir.to_path_buf(),
            message: error.to_string(),
        })?;

        if entry.file_type().is_file() && entry.file_name() == index_name.as_str() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_post(root: &Path, slug: &str, content: &str) -> PathBuf {
        let dir = root.join("posts").join(slug);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.tera");
        fs::write(&path, content).unwrap();
        path
    }

    fn set_mtime(path: &Path, seconds: u64) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds))
            .unwrap();
    }

    fn config_for(dir: &Path) -> Config {
        Config::from_options(&BuildOptions::new(dir))
    }

    fn titles(posts: &[Post]) -> Vec<String> {
        posts
            .iter()
            .map(|post| post.front_matter.get_string("title").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_posts_sorted_oldest_first() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "a-newest", "{\"title\": \"Newest\", \"date\": \"2024-03-01\"}---\n");
        write_post(dir.path(), "b-oldest", "{\"title\": \"Oldest\", \"date\": \"2023-01-01\"}---\n");
        let middle = write_post(dir.path(), "c-middle", "{\"title\": \"Middle\"}---\n");
        set_mtime(&middle, 1_690_000_000);

        let posts = collect_posts(&config_for(dir.path())).await.unwrap();

        assert_eq!(titles(&posts), vec!["Oldest", "Middle", "Newest"]);
        assert_eq!(posts[1].href, "/posts/c-middle/index.html");
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_discovery_order() {
        let dir = TempDir::new().unwrap();
        for slug in ["charlie", "alpha", "bravo"] {
            write_post(
                dir.path(),
                slug,
                &format!("{{\"title\": \"{slug}\", \"date\": \"2024-01-01\"}}---\n"),
            );
        }

        let first = collect_posts(&config_for(dir.path())).await.unwrap();
        let second = collect_posts(&config_for(dir.path())).await.unwrap();

        assert_eq!(titles(&first), vec!["alpha", "bravo", "charlie"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_only_index_files_one_level_deep() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "real", "{\"title\": \"Real\"}---\n");
        fs::write(dir.path().join("posts/stray.tera"), "{}---\n").unwrap();
        fs::write(dir.path().join("posts/real/notes.tera"), "{}---\n").unwrap();
        write_post(dir.path(), "real/deeper", "{\"title\": \"Deep\"}---\n");

        let posts = collect_posts(&config_for(dir.path())).await.unwrap();
        assert_eq!(titles(&posts), vec!["Real"]);
    }

    #[tokio::test]
    async fn test_posts_outside_input_tree() {
        let site = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let journal = elsewhere.path().join("journal");
        write_post(&journal, "hello", "{\"title\": \"Away\"}---\nBody");

        let options = BuildOptions::new(site.path()).posts_dir(journal.join("posts"));
        let posts = collect_posts(&Config::from_options(&options)).await.unwrap();

        assert_eq!(titles(&posts), vec!["Away"]);
        assert_eq!(posts[0].href, "/posts/hello/index.html");
    }

    #[test]
    fn test_href_root_for_relative_paths() {
        let paths = BuildOptions::new(".").posts_dir("posts").paths();
        assert_eq!(href_root(&paths), Path::new(""));

        let paths = BuildOptions::new("site").paths();
        assert_eq!(href_root(&paths), Path::new("site"));
    }

    #[tokio::test]
    async fn test_missing_posts_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let posts = collect_posts(&config_for(dir.path())).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_post_aborts_collection() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "good", "{\"title\": \"Good\"}---\n");
        let bad = write_post(dir.path(), "bad", "{\"title\": }---\n");

        let error = collect_posts(&config_for(dir.path())).await.unwrap_err();
        match error {
            SitegenError::Parse { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_posts_carry_body_and_summary() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "hello", "{\"title\":\"Hi\"}---\nBody text");

        let posts = collect_posts(&config_for(dir.path())).await.unwrap();
        assert_eq!(posts[0].front_matter.body(), "Body text");
        assert_eq!(posts[0].front_matter.summary(), "Body text");
    }
}
