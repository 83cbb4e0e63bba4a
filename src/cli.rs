use std::fmt::Display;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Args, ColorChoice, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::{Generator, Shell, generate};
use clap_complete_nushell::Nushell;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::info;

use crate::config::Config;
use crate::dump::{self, LinkMode};
use crate::git::GitStore;
use crate::history::{self, MessageAnnotator};
use crate::{AppResult, render};

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
    .context(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta))))
    .context_value(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
    );

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "literate-git - Present git history as a narrative

Two things can be done with a range of commits (everything reachable from the
end revision but not from the begin revision):
- render it as a single HTML document with one section per commit, in an order
  where every commit comes after its parents
- dump the full tree of every commit in it to disk, storing each file content
  once and hard-linking it into per-commit directories

Logs go to stderr; set LITGIT_LOG (e.g. LITGIT_LOG=literate_git=trace) to
override the level chosen with -v/-q.";

static DUMP_CMD_ABOUT: &str = "Write the tree of every commit in REV1..REV2 under OUTPUT_ROOT

Layout:
  OUTPUT_ROOT/blobs/<2 hex>/<38 hex>                 one file per unique blob
  OUTPUT_ROOT/commit-trees/<2 hex>/<38 hex>/<path>   hard links into blobs/

With --manifest, commit-trees/ is replaced by OUTPUT_ROOT/manifest.json mapping
each commit's paths to blob ids, for filesystems without hard links.
Re-running over existing output only adds what is missing.";

static RENDER_CMD_ABOUT: &str = "Render BEGIN_COMMIT..END_COMMIT as one HTML document

URL_STRATEGY_REF chooses the per-commit SOURCE and RESULT links:
  example          links to a sample deployment and source tree
  example-query    result links carrying several query parameters
  none             no links
  <name>           a strategy from the url_strategies table of the config file
  <path>           a JSON file such as {\"result_url\": \"https://host/{sha1}/\"}

Templates expand {sha1} to the full commit id and {short} to 7 characters.";

/// literate-git - Present git history as a narrative.
#[derive(Parser, Debug, Clone)]
#[command(author, version, propagate_version = true, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// Color choice for the output
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Configuration file to use instead of ~/.config/literate-git/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Subcommand to run
    #[command(subcommand)]
    pub cmd: Cmd,
}

/// Where to find the repository.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path inside the git repository to read from
    #[arg(short = 'C', long = "repo", default_value = ".")]
    pub repo: PathBuf,
}

/// Top-level commands supported by the CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    #[command(about = "Write the tree of every commit in a range to disk", long_about = DUMP_CMD_ABOUT)]
    DumpAllTrees {
        /// Directory to create blobs/ and commit-trees/ in
        output_root: PathBuf,

        /// Commit whose ancestry is left out
        rev1: String,

        /// Last commit to dump
        rev2: String,

        /// Write manifest.json instead of hard-linked commit trees
        #[arg(long)]
        manifest: bool,

        #[command(flatten)]
        repo: RepoArgs,
    },

    #[command(about = "Render a range of history as HTML", long_about = RENDER_CMD_ABOUT)]
    Render {
        /// Document title
        title: String,

        /// Commit whose ancestry is left out
        begin_commit: String,

        /// Last commit to render
        end_commit: String,

        /// Built-in strategy name, configured strategy name, or JSON file path
        url_strategy_ref: String,

        /// Link every section to its result and source (default)
        #[arg(long, overrides_with = "no_results")]
        results: bool,

        /// Leave out result and source links
        #[arg(long, overrides_with = "results")]
        no_results: bool,

        /// Output file to write the document to
        /// If not provided, prints to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Generate shell completion for a given shell
    Completion {
        /// Output file to write the completion script to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// The shell to generate the completion for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Supported completion targets for shell auto-completion.
#[derive(ValueEnum, Clone, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
    Nushell,
}

impl Display for CompletionShell {
    /// Render the canonical shell name string.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompletionShell::Bash => "bash",
            CompletionShell::Zsh => "zsh",
            CompletionShell::Fish => "fish",
            CompletionShell::PowerShell => "powershell",
            CompletionShell::Elvish => "elvish",
            CompletionShell::Nushell => "nushell",
        };
        write!(f, "{}", s)
    }
}

impl Generator for &CompletionShell {
    fn generate(&self, cmd: &clap::builder::Command, buf: &mut dyn Write) {
        match self {
            CompletionShell::Bash => Shell::Bash.generate(cmd, buf),
            CompletionShell::Zsh => Shell::Zsh.generate(cmd, buf),
            CompletionShell::Fish => Shell::Fish.generate(cmd, buf),
            CompletionShell::PowerShell => Shell::PowerShell.generate(cmd, buf),
            CompletionShell::Elvish => Shell::Elvish.generate(cmd, buf),
            CompletionShell::Nushell => Nushell.generate(cmd, buf),
        }
    }

    fn file_name(&self, name: &str) -> String {
        match self {
            CompletionShell::Bash => Shell::Bash.file_name(name),
            CompletionShell::Zsh => Shell::Zsh.file_name(name),
            CompletionShell::Fish => Shell::Fish.file_name(name),
            CompletionShell::PowerShell => Shell::PowerShell.file_name(name),
            CompletionShell::Elvish => Shell::Elvish.file_name(name),
            CompletionShell::Nushell => Nushell.file_name(name),
        }
    }
}

impl Cli {
    /// Whether log lines on stderr should carry ANSI colours.
    pub fn ansi(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }

    /// Execute the chosen top-level command.
    #[tracing::instrument(name = "Running command", level = "info", skip(self))]
    pub async fn run(&self) -> AppResult<()> {
        match &self.cmd {
            Cmd::DumpAllTrees {
                output_root,
                rev1,
                rev2,
                manifest,
                repo,
            } => {
                let store = GitStore::discover(&repo.repo)?;
                let mode = if *manifest {
                    LinkMode::Manifest
                } else {
                    LinkMode::HardLink
                };
                let summary = dump::dump(&store, rev1, rev2, output_root, mode).await?;
                info!(
                    "Dumped {} commits to {}: {} of {} unique blobs written, {} links created",
                    summary.commits,
                    output_root.display(),
                    summary.blobs_written,
                    summary.unique_blobs,
                    summary.links_created
                );
                Ok(())
            }
            Cmd::Render {
                title,
                begin_commit,
                end_commit,
                url_strategy_ref,
                results,
                no_results,
                output,
                repo,
            } => {
                // Resolve links first so a bad reference fails before any history is walked.
                let config = Config::load(self.config.as_deref()).await?;
                let urls = config.url_strategy(url_strategy_ref).await?;

                let store = GitStore::discover(&repo.repo)?;
                let range = history::resolve(&store, begin_commit, end_commit)?;
                let sections = history::build(&store, &range, &MessageAnnotator)?;
                let include_results = *results || !*no_results;
                let html = render::render(&sections, urls.as_ref(), title, include_results)?;

                if let Some(output_path) = output {
                    tokio::fs::write(output_path, html).await?;
                    info!(
                        "Rendered {} sections to {}",
                        sections.len(),
                        output_path.display()
                    );
                } else {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(html.as_bytes())?;
                    stdout.flush()?;
                }
                Ok(())
            }
            Cmd::Completion { shell, output } => {
                let mut cmd = Cli::command();
                if let Some(output_path) = output {
                    let mut file = std::fs::OpenOptions::new()
                        .write(true)
                        .truncate(true)
                        .create(true)
                        .open(output_path)?;
                    generate(shell, &mut cmd, "literate-git", &mut file);
                    info!(
                        "Generated completion script for {} at {}",
                        shell,
                        output_path.display()
                    );
                } else {
                    generate(shell, &mut cmd, "literate-git", &mut std::io::stdout());
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::git::fixtures::TestRepo;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("literate-git").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn results_default_on_and_last_flag_wins() {
        let cli = parse(&["render", "T", "a", "b", "example"]);
        assert!(matches!(cli.cmd, Cmd::Render { no_results: false, .. }));

        let cli = parse(&["render", "T", "a", "b", "example", "--no-results"]);
        assert!(matches!(cli.cmd, Cmd::Render { no_results: true, .. }));

        let cli = parse(&["render", "T", "a", "b", "example", "--no-results", "--results"]);
        assert!(matches!(cli.cmd, Cmd::Render { no_results: false, .. }));
    }

    #[test]
    fn dump_takes_repo_and_manifest_flags() {
        let cli = parse(&["dump-all-trees", "out", "R", "C", "--manifest", "-C", "/tmp/repo", "-q"]);
        match cli.cmd {
            Cmd::DumpAllTrees {
                output_root,
                manifest,
                repo,
                ..
            } => {
                assert_eq!(output_root, PathBuf::from("out"));
                assert!(manifest);
                assert_eq!(repo.repo, PathBuf::from("/tmp/repo"));
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[tokio::test]
    async fn render_writes_document_to_output_file() {
        let fixture = TestRepo::new();
        let root = fixture.commit(&[], &[("README", "hi\n")], "Initial empty state", 100);
        let tip = fixture.commit(&[root], &[("README", "hi\n"), ("code.js", "1;\n")], "Add code", 200);
        fixture.branch("start", root);
        fixture.branch("for-rendering", tip);
        let out = TempDir::new().unwrap();
        let html_path = out.path().join("index.html");
        let config_path = out.path().join("config.json");
        std::fs::write(&config_path, "{}").unwrap();

        let repo = fixture.path().to_str().unwrap();
        let html = html_path.to_str().unwrap();
        let config = config_path.to_str().unwrap();
        let cli = parse(&[
            "--config",
            config,
            "render",
            "My cool project",
            "start",
            "for-rendering",
            "example-query",
            "-C",
            repo,
            "-o",
            html,
        ]);
        cli.run().await.unwrap();

        let document = std::fs::read_to_string(&html_path).unwrap();
        assert!(document.contains(&format!("data-commit-sha1=\"{tip}\"")));
        assert!(!document.contains(&root.to_string()));
        assert!(document.contains("<h1>My cool project</h1>"));
        assert!(document.contains("<li>code.js</li>"));
    }

    #[tokio::test]
    async fn render_with_unknown_strategy_fails_before_reading_history() {
        let out = TempDir::new().unwrap();
        let config_path = out.path().join("config.json");
        std::fs::write(&config_path, "{}").unwrap();
        let missing_repo = out.path().join("not-a-repo");

        let cli = parse(&[
            "--config",
            config_path.to_str().unwrap(),
            "render",
            "T",
            "a",
            "b",
            "no-such-strategy",
            "-C",
            missing_repo.to_str().unwrap(),
        ]);
        let err = cli.run().await.unwrap_err();
        assert!(
            matches!(err, crate::AppError::LinkStrategyResolution { .. }),
            "{err:?}"
        );
    }
}
