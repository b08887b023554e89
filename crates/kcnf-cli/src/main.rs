use std::io::{self, Write};
use std::process;

use clap::{ArgAction, Args, Parser};
use kcnf_picker::PickerError;
use tracing::debug;

use kcnf_cli::{
    AppError, Candidate, ConfigError, Dispatcher, OutputMode, Overrides, RunOptions, Selector,
    logging, pipeline, scan, selector, sort_candidates,
};

#[derive(Debug, Parser)]
#[command(
    name = "kubectl-cnf",
    bin_name = "kubectl cnf",
    version,
    disable_version_flag = true,
    about = "Switch between current-contexts in multiple kubeconfigs"
)]
struct Cli {
    /// Directory searched recursively for kubeconfigs.
    #[arg(short = 'd', long = "dir", visible_alias = "directory", value_name = "DIR")]
    dir: Option<String>,
    /// Picker height: N% of the terminal or N rows.
    #[arg(short = 'H', long, value_name = "HEIGHT")]
    height: Option<String>,
    /// Do not print the selected context.
    #[arg(short, long, visible_alias = "no-verbose", short_alias = 'V')]
    quiet: bool,
    #[command(flatten)]
    mode: ModeFlags,
    /// Print version. `-V` belongs to `--quiet`.
    #[allow(dead_code)]
    #[arg(long, action = ArgAction::Version)]
    version: Option<bool>,
    /// Initial picker query.
    #[arg(value_name = "QUERY")]
    query: Vec<String>,
}

#[derive(Debug, Args)]
#[group(multiple = false)]
struct ModeFlags {
    /// Print an export statement instead of launching a shell.
    #[arg(short, long, visible_alias = "no-shell", short_alias = 'S')]
    print: bool,
    /// Copy an export statement to the clipboard.
    #[arg(short, long, visible_alias = "clip")]
    clipboard: bool,
    /// Point ~/.kube/config at the selected kubeconfig.
    #[arg(short, long)]
    symlink: bool,
}

impl ModeFlags {
    fn mode(&self) -> Option<OutputMode> {
        if self.print {
            Some(OutputMode::Print)
        } else if self.clipboard {
            Some(OutputMode::Clipboard)
        } else if self.symlink {
            Some(OutputMode::Symlink)
        } else {
            None
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            dir: self.dir.clone(),
            height: self.height.clone(),
            quiet: self.quiet,
            mode: self.mode.mode(),
        }
    }

    fn query(&self) -> String {
        self.query.join(" ")
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code = if error.use_stderr() { 1 } else { 0 };
            let _ = error.print();
            process::exit(code);
        }
    };

    logging::init();

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        process::exit(error.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut stdout = io::stdout();
    run_with(
        cli,
        RunOptions::from_env,
        |options, query| selector::configure_picker(&options.height, query, options.bat_available),
        &mut stdout,
    )
    .map(|_| ())
}

fn run_with<LoadOptions, MakeSelector, S, W>(
    cli: Cli,
    load_options: LoadOptions,
    make_selector: MakeSelector,
    out: &mut W,
) -> Result<Option<Candidate>, AppError>
where
    LoadOptions: FnOnce(Overrides) -> Result<RunOptions, ConfigError>,
    MakeSelector: FnOnce(&RunOptions, &str) -> Result<S, PickerError>,
    S: Selector,
    W: Write + Send,
{
    let query = cli.query();
    let options = load_options(cli.overrides())?;
    debug!(dir = %options.config_dir.display(), mode = ?options.mode, "options resolved");

    let mut candidates = scan(&options.config_dir)?;
    if candidates.is_empty() {
        return Err(AppError::NoCandidates(options.config_dir));
    }
    sort_candidates(&mut candidates);

    let selector = make_selector(&options, &query)?;
    let dispatcher = Dispatcher::new(&options);

    pipeline::run(&candidates, &selector, |candidate| dispatcher.dispatch(candidate, out))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use clap::CommandFactory;
    use crossbeam::channel::{Receiver, Sender};
    use kcnf_cli::UiError;

    use super::*;

    /// Reads every offered line and accepts the one at `pick`.
    struct Scripted {
        pick: Option<usize>,
    }

    impl Selector for Scripted {
        fn select(&self, input: Receiver<String>, output: Sender<String>) -> Result<(), PickerError> {
            let lines: Vec<String> = input.iter().collect();
            if let Some(line) = self.pick.and_then(|index| lines.get(index)) {
                output.send(line.clone()).expect("consumer is listening");
            }
            Ok(())
        }
    }

    fn write_config(path: &Path, context: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, format!("apiVersion: v1\nkind: Config\ncurrent-context: {context}\n"))
            .expect("write kubeconfig");
    }

    fn loader(
        home: &Path,
        extra: &[(&str, &str)],
    ) -> impl FnOnce(Overrides) -> Result<RunOptions, ConfigError> {
        let mut env = vec![("HOME".to_string(), home.display().to_string())];
        env.extend(extra.iter().map(|(key, value)| (key.to_string(), value.to_string())));
        move |overrides| RunOptions::from_pairs(env, overrides)
    }

    fn picking(pick: Option<usize>) -> impl FnOnce(&RunOptions, &str) -> Result<Scripted, PickerError> {
        move |_, _| Ok(Scripted { pick })
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn print_mode_writes_export_for_first_sorted_context() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let configs = temp.path().join(".kube/configs");
        write_config(&configs.join("zeta"), "testing-eu-01");
        write_config(&configs.join("nested/alpha"), "staging-us-01");

        let cli = Cli::parse_from(["kubectl-cnf", "-p"]);
        let mut out = Vec::new();

        let dispatched = run_with(cli, loader(temp.path(), &[]), picking(Some(0)), &mut out)
            .expect("run should succeed");

        let source = configs.join("nested/alpha");
        assert_eq!(dispatched.map(|candidate| candidate.source), Some(source.clone()));
        assert_eq!(
            String::from_utf8(out).expect("utf-8 output"),
            format!("⮺ staging-us-01\nexport KUBECONFIG='{}'\n", source.display())
        );
    }

    #[test]
    fn quiet_flag_and_env_mode_combine() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let configs = temp.path().join("configs");
        write_config(&configs.join("prod"), "prod");

        let cli = Cli::parse_from(["kubectl-cnf", "-V", "--dir", "~/configs"]);
        let mut out = Vec::new();

        run_with(
            cli,
            loader(temp.path(), &[("KCNF_NO_SHELL", "true")]),
            picking(Some(0)),
            &mut out,
        )
        .expect("run should succeed");

        assert_eq!(
            String::from_utf8(out).expect("utf-8 output"),
            format!("export KUBECONFIG='{}'\n", configs.join("prod").display())
        );
    }

    #[test]
    fn cancelled_selection_succeeds_without_output() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_config(&temp.path().join(".kube/configs/prod"), "prod");

        let cli = Cli::parse_from(["kubectl-cnf", "--print"]);
        let mut out = Vec::new();

        let dispatched = run_with(cli, loader(temp.path(), &[]), picking(None), &mut out)
            .expect("cancellation is not an error");

        assert_eq!(dispatched, None);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_directory_is_reported_before_the_picker_starts() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let configs = temp.path().join(".kube/configs");
        fs::create_dir_all(&configs).expect("create configs dir");
        fs::write(configs.join("notes.txt"), "nothing to see\n").expect("write notes");

        let cli = Cli::parse_from(["kubectl-cnf", "-p"]);
        let never = |_: &RunOptions, _: &str| -> Result<Scripted, PickerError> {
            panic!("picker must not be configured without candidates")
        };

        let err = run_with(cli, loader(temp.path(), &[]), never, &mut Vec::new())
            .expect_err("empty directory should fail");

        assert!(matches!(&err, AppError::NoCandidates(path) if *path == configs));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let cli = Cli::parse_from(["kubectl-cnf", "-p", "-d", "$HOME/missing"]);
        let err = run_with(cli, loader(temp.path(), &[]), picking(Some(0)), &mut Vec::new())
            .expect_err("missing directory should fail");

        assert!(matches!(&err, AppError::NotFound(path) if *path == temp.path().join("missing")));
    }

    #[test]
    fn positional_words_form_the_initial_query() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_config(&temp.path().join(".kube/configs/prod"), "prod");

        let cli = Cli::parse_from(["kubectl-cnf", "-p", "prod", "eu"]);
        let mut seen = None;

        run_with(
            cli,
            loader(temp.path(), &[]),
            |options: &RunOptions, query: &str| {
                seen = Some((query.to_string(), options.height.clone()));
                Ok(Scripted { pick: None })
            },
            &mut Vec::new(),
        )
        .expect("run should succeed");

        assert_eq!(seen, Some(("prod eu".to_string(), "40%".to_string())));
    }

    #[test]
    fn invalid_picker_configuration_is_a_ui_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_config(&temp.path().join(".kube/configs/prod"), "prod");

        let cli = Cli::parse_from(["kubectl-cnf", "-p", "--height", "tall"]);
        let err = run_with(
            cli,
            loader(temp.path(), &[]),
            |options: &RunOptions, query: &str| {
                selector::configure_picker(&options.height, query, options.bat_available)
            },
            &mut Vec::new(),
        )
        .expect_err("invalid height should fail");

        assert!(matches!(err, AppError::Ui(UiError::Picker(PickerError::InvalidOption { .. }))));
    }

    #[test]
    fn conflicting_env_modes_are_a_config_error() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let cli = Cli::parse_from(["kubectl-cnf"]);
        let err = run_with(
            cli,
            loader(temp.path(), &[("KCNF_NO_SHELL", "1"), ("KCNF_SYMLINK", "1")]),
            picking(Some(0)),
            &mut Vec::new(),
        )
        .expect_err("two env modes should fail");

        assert!(matches!(err, AppError::Config(ConfigError::ConflictingModes(_))));
    }

    #[test]
    fn mode_flags_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["kubectl-cnf", "-p", "-c"]).expect_err("conflict");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn legacy_aliases_map_to_current_flags() {
        let cli = Cli::parse_from(["kubectl-cnf", "--no-shell", "--no-verbose", "--directory", "/tmp/k"]);

        assert_eq!(cli.mode.mode(), Some(OutputMode::Print));
        assert!(cli.quiet);
        assert_eq!(cli.dir.as_deref(), Some("/tmp/k"));

        let cli = Cli::parse_from(["kubectl-cnf", "-S"]);
        assert_eq!(cli.mode.mode(), Some(OutputMode::Print));

        let cli = Cli::parse_from(["kubectl-cnf", "--clip"]);
        assert_eq!(cli.mode.mode(), Some(OutputMode::Clipboard));
    }
}
