use crate::output::{print_json, print_table};
use anyhow::Result;
use pagesmith_core::config::ServiceConfig;
use pagesmith_core::github::GitHubClient;
use pagesmith_core::remote::{CommitRef, RepoHost};
use pagesmith_core::resolver::find_by_prefix;
use pagesmith_core::types::pages_url;
use serde::Serialize;

const RECENT_COMMITS: usize = 5;
const EXPECTED_FILES: [&str; 2] = ["index.html", "README.md"];

#[derive(Serialize)]
struct FileCheck {
    path: &'static str,
    present: bool,
}

#[derive(Serialize)]
struct VerifyReport {
    repo: String,
    repo_url: String,
    pages_url: String,
    commits: Vec<CommitRef>,
    files: Vec<FileCheck>,
    hosting: Option<String>,
}

pub fn run(config: &ServiceConfig, task: &str, json: bool) -> Result<()> {
    let host = GitHubClient::new(&config.github)?;
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(inspect(&host, task))?;

    if json {
        return print_json(&report);
    }

    println!("Repository: {}", report.repo_url);
    println!("Pages:      {}", report.pages_url);
    println!(
        "Hosting:    {}",
        report.hosting.as_deref().unwrap_or("not configured")
    );
    println!();

    let rows = report
        .commits
        .iter()
        .map(|c| {
            vec![
                c.sha.chars().take(7).collect::<String>(),
                c.message.lines().next().unwrap_or_default().to_string(),
            ]
        })
        .collect();
    print_table(&["SHA", "MESSAGE"], rows);
    println!();

    for f in &report.files {
        let mark = if f.present { "ok" } else { "MISSING" };
        println!("{:<12} {mark}", f.path);
    }

    if report.files.iter().any(|f| !f.present) {
        anyhow::bail!("repository '{}' is missing expected files", report.repo);
    }
    Ok(())
}

async fn inspect(host: &dyn RepoHost, task: &str) -> Result<VerifyReport> {
    let repo = find_by_prefix(host, task).await?;
    let commits = host.list_commits(&repo, RECENT_COMMITS).await?;

    let mut files = Vec::with_capacity(EXPECTED_FILES.len());
    for path in EXPECTED_FILES {
        let present = host
            .read_file(&repo, path, &repo.default_branch)
            .await?
            .is_some();
        files.push(FileCheck { path, present });
    }
    let hosting = host.hosting_status(&repo).await?;

    Ok(VerifyReport {
        pages_url: pages_url(&repo.owner, &repo.name),
        repo: repo.name,
        repo_url: repo.html_url,
        commits,
        files,
        hosting,
    })
}
