use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{exit, Command};

use graft::config::{ExecConfig, PipelineConfig};
use graft::engine::prims::prelude;
use graft::engine::{execute_with_hook, GraphSnapshot, Outcome, StepHook};
use graft::flat::{Branch, Expr, Function, Pattern, Program, QName};
use graft::lift::{lift_program, LiftOptions};
use graft::{persist, pretty};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            usage();
            return;
        }
        Err(msg) => {
            eprintln!("error: {}", msg);
            usage();
            exit(2);
        }
    };
    if let Err(msg) = run(opts) {
        eprintln!("error: {}", msg);
        exit(1);
    }
}

struct Options {
    /// `None` runs the built-in demo program.
    program: Option<PathBuf>,
    exec: ExecConfig,
    lift: LiftOptions,
    pipeline: PipelineConfig,
    out_dir: Option<PathBuf>,
}

fn usage() {
    eprintln!("usage: graft <program.json | --demo> [options]");
    eprintln!("  --entry NAME       entry function (default: main)");
    eprintln!("  --no-lift          skip the lifting pass");
    eprintln!("  --no-exec          stop after normalization");
    eprintln!("  --no-lift-case     keep case expressions in branch bodies");
    eprintln!("  --no-lift-scrutinee  keep complex case scrutinees inline");
    eprintln!("  --out DIR          write the normalized program to DIR");
    eprintln!("  --graph N          show-graph level 0-3 (default: 0)");
    eprintln!("  --viewer CMD       viewer command for graph snapshots (default: dot)");
    eprintln!("  --interactive      confirm before continuing after each result");
    eprintln!("  -v N               verbosity 0-3 (default: 1)");
}

fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        return Ok(None);
    }
    let mut opts = Options {
        program: if args[0] == "--demo" {
            None
        } else {
            Some(PathBuf::from(&args[0]))
        },
        exec: ExecConfig::default(),
        lift: LiftOptions::default(),
        pipeline: PipelineConfig::default(),
        out_dir: None,
    };
    let mut i = 1;
    let value = |i: &mut usize| -> Result<String, String> {
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| format!("missing value after {}", args[*i - 1]))
    };
    while i < args.len() {
        match args[i].as_str() {
            "--entry" => opts.exec.entry = value(&mut i)?,
            "--no-lift" => opts.pipeline.lift = false,
            "--no-exec" => opts.pipeline.execute = false,
            "--no-lift-case" => opts.lift.lift_case = false,
            "--no-lift-scrutinee" => opts.lift.lift_complex_scrutinee = false,
            "--out" => opts.out_dir = Some(PathBuf::from(value(&mut i)?)),
            "--graph" => {
                opts.exec.show_graph_level = value(&mut i)?
                    .parse()
                    .map_err(|_| "invalid --graph level".to_string())?
            }
            "--viewer" => opts.exec.viewer_command = value(&mut i)?,
            "--interactive" => opts.exec.interactive = true,
            "-v" => {
                opts.exec.verbosity = value(&mut i)?
                    .parse()
                    .map_err(|_| "invalid verbosity".to_string())?
            }
            other => return Err(format!("unknown option {}", other)),
        }
        i += 1;
    }
    Ok(Some(opts))
}

fn run(opts: Options) -> Result<(), String> {
    // Configuration problems abort before any work begins.
    opts.pipeline.validate().map_err(|e| e.to_string())?;
    opts.exec.validate().map_err(|e| e.to_string())?;

    let program = match &opts.program {
        Some(path) => persist::load_program(path).map_err(|e| e.to_string())?,
        None => demo_program(),
    };
    let verbosity = opts.exec.verbosity;
    if verbosity >= 1 {
        println!(
            "loaded module {} ({} functions)",
            program.module,
            program.functions.len()
        );
    }

    let normalized: Program = if opts.pipeline.lift {
        lift_program(&opts.lift, &program)
    } else {
        program
    };
    if verbosity >= 2 {
        println!("{}", pretty::program(&normalized));
    }
    if let Some(dir) = &opts.out_dir {
        let path = persist::save_program(dir, &normalized).map_err(|e| e.to_string())?;
        if verbosity >= 1 {
            println!("wrote {}", path.display());
        }
    }
    if !opts.pipeline.execute {
        return Ok(());
    }

    let hook: Option<Box<dyn StepHook>> = if opts.exec.show_graph_level > 0 {
        Some(Box::new(ViewerHook::new(&opts.exec)?))
    } else {
        None
    };

    let results = execute_with_hook(&opts.exec, &normalized, hook).map_err(|e| e.to_string())?;
    let mut delivered = 0usize;
    for item in results {
        match item {
            Ok(Outcome::Solution(term)) => {
                delivered += 1;
                println!("result {}: {}", delivered, term);
            }
            Ok(Outcome::MatchFailure(func)) => {
                delivered += 1;
                println!("result {}: pattern match failure in {}", delivered, func);
            }
            Err(fatal) => return Err(fatal.to_string()),
        }
        if opts.exec.interactive && !confirm("more solutions?") {
            break;
        }
    }
    if delivered == 0 && verbosity >= 1 {
        println!("no solutions");
    }
    Ok(())
}

/// Built-in sample: a narrowed boolean steering into a choice.
///
///   main = let x free in
///            case x of { True  -> 1
///                      ; False -> let y = (2 + 3) ? 7 in y }
fn demo_program() -> Program {
    let m = "Demo";
    let sum = Expr::func(QName::prelude("+"), vec![Expr::int(2), Expr::int(3)]);
    let false_body = Expr::Let(
        vec![(1, Expr::Or(Box::new(sum), Box::new(Expr::int(7))))],
        Box::new(Expr::Var(1)),
    );
    let body = Expr::Free(
        vec![0],
        Box::new(Expr::Case(
            Box::new(Expr::Var(0)),
            vec![
                Branch {
                    pattern: Pattern::Cons(QName::prelude("True"), vec![]),
                    body: Expr::int(1),
                },
                Branch {
                    pattern: Pattern::Cons(QName::prelude("False"), vec![]),
                    body: false_body,
                },
            ],
        )),
    );
    let mut program = Program::new(m);
    program.imports.push("Prelude".to_string());
    program.functions = prelude();
    program
        .functions
        .push(Function::defined(QName::new(m, "main"), vec![], body));
    program
}

fn confirm(prompt: &str) -> bool {
    print!("{} [Y/n] ", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "" | "y" | "Y" | "yes")
}

/// Writes each snapshot as a DOT file and hands it to the viewer command.
/// With `--interactive --graph 3` the run pauses after every step.
struct ViewerHook {
    command: String,
    pause_each_step: bool,
    dir: PathBuf,
    count: usize,
}

impl ViewerHook {
    fn new(exec: &ExecConfig) -> Result<Self, String> {
        let dir = std::env::temp_dir().join(format!("graft-{}", std::process::id()));
        fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
        Ok(ViewerHook {
            command: exec.viewer_command.clone(),
            pause_each_step: exec.interactive && exec.show_graph_level >= 3,
            dir,
            count: 0,
        })
    }
}

impl StepHook for ViewerHook {
    fn on_step(&mut self, snapshot: &GraphSnapshot) -> bool {
        self.count += 1;
        let path = self.dir.join(format!("step{:05}.dot", self.count));
        if let Err(e) = fs::write(&path, snapshot.to_dot()) {
            eprintln!("viewer: cannot write {}: {}", path.display(), e);
            return true;
        }
        match Command::new(&self.command).arg(&path).status() {
            Ok(status) if !status.success() => {
                eprintln!("viewer: {} exited with {}", self.command, status);
            }
            Err(e) => eprintln!("viewer: cannot run {}: {}", self.command, e),
            _ => {}
        }
        if self.pause_each_step {
            confirm("next step?")
        } else {
            true
        }
    }
}
