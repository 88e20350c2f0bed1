// tests/integration_test.rs
use git2::{Repository as Git2Repo, RepositoryInitOptions, Signature};
use git_release::analyzer::ChangeAnalyzer;
use git_release::cli::{PipelineOptions, ReleasePipeline};
use git_release::config::{Config, Secrets};
use git_release::domain::TagPattern;
use git_release::git::{Git2Repository, Repository, TagCreation};
use git_release::hosting::InMemoryHost;
use git_release::notify::RecordingSink;
use git_release::reasoning::DisabledReasoning;
use git_release::report::RunOutcome;
use git_release::stages::CommandStageRunner;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_git_release_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_git-release"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-release"));
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--skip-stages"));
}

/// A working repository on `main` with a bare `origin` next to it
struct Fixture {
    _dir: TempDir,
    work: std::path::PathBuf,
    origin: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        let origin = dir.path().join("origin.git");

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Git2Repo::init_opts(&work, &opts).unwrap();
        Git2Repo::init_bare(&origin).unwrap();
        repo.remote("origin", origin.to_str().unwrap()).unwrap();

        Fixture {
            _dir: dir,
            work,
            origin,
        }
    }

    fn commit(&self, name: &str, content: &str, message: &str) -> git2::Oid {
        let repo = Git2Repo::open(&self.work).unwrap();
        fs::write(self.work.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parents: Vec<git2::Commit<'_>> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    fn open(&self) -> Git2Repository {
        Git2Repository::open(&self.work).unwrap()
    }

    fn origin_has_tag(&self, tag: &str) -> bool {
        let origin = Git2Repo::open_bare(&self.origin).unwrap();
        let found = origin.find_reference(&format!("refs/tags/{}", tag)).is_ok();
        found
    }
}

#[test]
fn test_tag_push_and_remote_lookup() {
    let fx = Fixture::new();
    let head = fx.commit("a.txt", "one\n", "chore: init");
    let repo = fx.open();

    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    assert!(!repo.remote_has_tag("origin", "v1.0.0").unwrap());

    assert_eq!(
        repo.create_annotated_tag("v1.0.0", head, "Release v1.0.0").unwrap(),
        TagCreation::Created
    );
    repo.push_tags("origin", &["v1.0.0"]).unwrap();

    assert!(fx.origin_has_tag("v1.0.0"));
    assert!(repo.remote_has_tag("origin", "v1.0.0").unwrap());
    assert_eq!(repo.remote_tag_oid("origin", "v1.0.0").unwrap(), Some(head));
    assert_eq!(repo.find_tag_oid("v1.0.0").unwrap(), Some(head));
    assert!(!repo.remote_has_tag("origin", "v2.0.0").unwrap());
    assert_eq!(repo.find_tag_oid("v2.0.0").unwrap(), None);
}

#[test]
fn test_remote_url_lookup() {
    let fx = Fixture::new();
    fx.commit("a.txt", "one\n", "chore: init");
    let repo = fx.open();

    assert_eq!(
        repo.remote_url("origin").unwrap().as_deref(),
        fx.origin.to_str()
    );
    assert_eq!(repo.remote_url("upstream").unwrap(), None);
}

#[test]
fn test_fetch_tags_brings_remote_tags_local() {
    let fx = Fixture::new();
    let head = fx.commit("a.txt", "one\n", "chore: init");
    let repo = fx.open();
    repo.push_branch("origin", "main").unwrap();

    // Tag created directly in origin by someone else
    {
        let origin = Git2Repo::open_bare(&fx.origin).unwrap();
        let target = origin.find_object(head, None).unwrap();
        let sig = Signature::now("Other", "other@example.com").unwrap();
        origin.tag("v0.9.0", &target, &sig, "elsewhere", false).unwrap();
    }

    assert_eq!(repo.find_tag_oid("v0.9.0").unwrap(), None);
    repo.fetch_tags("origin").unwrap();
    assert_eq!(repo.find_tag_oid("v0.9.0").unwrap(), Some(head));
}

#[test]
fn test_change_analyzer_on_real_history() {
    let fx = Fixture::new();
    let first = fx.commit("a.txt", "one\n", "chore: init");
    fx.commit("a.txt", "one\ntwo\n", "fix: handle two");
    let repo = fx.open();
    repo.create_annotated_tag("v1.0.0", first, "Release v1.0.0")
        .unwrap();

    let pattern = TagPattern::new("v{version}").unwrap();
    let analyzer = ChangeAnalyzer::new(&pattern);
    let mut warnings = Vec::new();

    let latest = analyzer
        .latest_release_tag(&repo, &mut warnings)
        .unwrap()
        .expect("tag reachable from HEAD");
    assert_eq!(latest.name, "v1.0.0");

    let set = analyzer.analyze(&repo, Some(&latest.name)).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.commits()[0].subject(), "fix: handle two");
    assert_eq!(set.total_stats().insertions, 1);
    assert!(set.summary().starts_with("1 commits since v1.0.0"));
}

#[test]
fn test_pipeline_end_to_end_with_local_origin() {
    let fx = Fixture::new();
    fx.commit(
        "Cargo.toml",
        "[package]\nname = \"tool\"\nversion = \"0.0.0\"\n",
        "chore: init",
    );
    fx.commit("src.txt", "feature\n", "feat: add export");
    let repo = fx.open();
    repo.push_branch("origin", "main").unwrap();

    let mut config = Config::default();
    config.repository.path = fx.work.clone();
    config.version_file.path = Some("Cargo.toml".into());
    config.stages.build = Some("test -f Cargo.toml".to_string());
    let secrets = Secrets {
        hosting_token: Some("token".to_string()),
        ..Secrets::default()
    };
    let host = InMemoryHost::new();
    let stages = CommandStageRunner::new(&fx.work);
    let sink = RecordingSink::new();

    let pipeline = ReleasePipeline {
        config: &config,
        secrets: &secrets,
        repo: &repo,
        host: &host,
        reasoning: &DisabledReasoning,
        stages: &stages,
        sink: &sink,
        options: PipelineOptions::default(),
    };

    let report = pipeline.run();
    assert_eq!(
        report.outcome,
        RunOutcome::Released {
            tag: "v0.1.0".to_string(),
            version: "0.1.0".to_string(),
        }
    );
    assert!(fx.origin_has_tag("v0.1.0"));
    assert_eq!(host.releases().len(), 1);

    let manifest = fs::read_to_string(fx.work.join("Cargo.toml")).unwrap();
    assert!(manifest.contains("version = \"0.1.0\""));
    let head = repo.head_oid().unwrap();
    let last = repo.get_commits_between(None, head).unwrap();
    assert_eq!(
        last.last().unwrap().subject(),
        "chore(release): bump version to 0.1.0 [skip ci]"
    );

    // Second run: only the bump commit is new, so nothing is released
    let again = pipeline.run();
    assert!(matches!(again.outcome, RunOutcome::NoRelease { .. }));
    assert_eq!(host.create_count(), 1);
    assert_eq!(sink.reports().len(), 2);
}
