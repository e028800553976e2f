use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gurukul_core::ai_evaluation::{ChatRole, LearnerTurn};
use gurukul_core::model::{EvaluationMethod, LessonId, StudentId, SupportedInput};
use gurukul_core::phase::LessonPhase;
use gurukul_core::quiz::{Question, QuizAttempt, QuizStep, Response};
use gurukul_core::route::LessonPath;
use gurukul_core::student::format_points;
use services::{
    AiEvaluationSession, AppConfig, AppServices, Clock, EvaluationReply, LessonChat,
    LessonSession, Navigation, NotificationCenter, SessionUpdate, TextCompletion,
};
use storage::fixtures::DEMO_STUDENT_NAME;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Parser)]
#[command(name = "gurukul")]
#[command(about = "Walk through phase-based lessons from the terminal")]
struct Cli {
    /// SQLite database url or path
    #[arg(long, global = true, env = "GURUKUL_DB_URL")]
    db: Option<String>,

    /// Student whose points are updated
    #[arg(long, global = true, env = "GURUKUL_STUDENT_ID")]
    student: Option<StudentId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a lesson: learning sections, mastery activity, then evaluation.
    Play {
        #[arg(long, default_value = "introduction-to-gravity")]
        lesson: LessonId,
        #[arg(long, default_value = "science")]
        subject: String,
        #[arg(long, default_value = "gravity")]
        topic: String,
    },
    /// Store the bundled sample lesson and the demo student.
    Seed,
    /// Parse a quiz file and print it as JSON.
    CheckQuiz { file: PathBuf },
    /// Show the student's points and level.
    Student,
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

//
// ─── TERMINAL I/O ──────────────────────────────────────────────────────────────
//

struct Terminal {
    lines: Lines<BufReader<Stdin>>,
    notifications: std::sync::Arc<NotificationCenter>,
    shown: usize,
}

impl Terminal {
    fn new(notifications: std::sync::Arc<NotificationCenter>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            notifications,
            shown: 0,
        }
    }

    /// Read one trimmed line; `None` at end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>, std::io::Error> {
        println!("{prompt}");
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_owned()))
    }

    fn flush_notifications(&mut self) {
        let history = self.notifications.history();
        for notification in history.iter().skip(self.shown) {
            println!(
                "  ** {} {}",
                notification.title, notification.message
            );
        }
        self.shown = history.len();
    }

    fn report(&mut self, update: &SessionUpdate) {
        self.flush_notifications();
        if let Some(student) = &update.student {
            println!("  {} now has {} points (level {})", student.name, student.points, student.level);
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn play(
    services: &AppServices,
    path: LessonPath,
) -> Result<(), Box<dyn std::error::Error>> {
    services
        .students()
        .ensure_student(services.student_id(), DEMO_STUDENT_NAME)
        .await?;
    let mut session = services.lesson_sessions().start(path).await?;
    let mut term = Terminal::new(services.notifications());
    println!("# {}", session.controller().lesson().title());

    loop {
        println!("\n[{}]", session.route());
        let phase = session.controller().current_phase();
        let navigation = match phase {
            LessonPhase::Learning => learning_step(services, &mut session, &mut term).await?,
            LessonPhase::Mastery => mastery_step(&mut session, &mut term).await?,
            LessonPhase::Evaluation => evaluation_step(services, &mut session, &mut term).await?,
        };
        match navigation {
            Some(Navigation::Exit(to)) => {
                println!("Back to {to}");
                break;
            }
            Some(Navigation::ExitAfter { to, delay }) => {
                println!(
                    "Lesson finished with {} evaluation points. Returning to {to}...",
                    format_points(session.controller().accumulated_score())
                );
                tokio::time::sleep(delay).await;
                break;
            }
            Some(Navigation::Phase(_)) | None => {}
        }
    }

    if !session.pending_awards().is_empty() {
        let update = session.retry_pending_awards().await;
        term.report(&update);
    }
    Ok(())
}

async fn learning_step(
    services: &AppServices,
    session: &mut LessonSession,
    term: &mut Terminal,
) -> Result<Option<Navigation>, Box<dyn std::error::Error>> {
    let progress = session.progress();
    if let Some(section) = session.controller().current_section() {
        let label = section.experience_tag().label();
        if let Some((position, total)) = progress.section_position {
            println!("{} ({position}/{total}) - {}", label.title, label.blurb);
        }
        if section.content_type().is_media() {
            println!("[{}] {}", section.content_type().as_str(), section.body());
            if let Some(caption) = section.caption() {
                println!("{caption}");
            }
        } else {
            println!("{}", section.body());
        }
    }

    let Some(input) = term.ask("(n)ext, (b)ack, ?question, (q)uit").await? else {
        return Ok(Some(Navigation::Exit(session.path().topic_path())));
    };
    let update = match input.as_str() {
        "n" | "" => session.advance().await?,
        "b" => session.retreat().await,
        "q" => return Ok(Some(Navigation::Exit(session.path().topic_path()))),
        question => {
            let question = question.trim_start_matches('?');
            if let Some(section) = session.controller().current_section() {
                let tutor = services.tutor();
                let mut chat = LessonChat::for_section(section);
                if let Some(reply) = chat.ask(tutor.as_ref(), question).await {
                    println!("Tutor: {}", reply.content);
                }
            }
            return Ok(None);
        }
    };
    term.report(&update);
    Ok(update.navigation)
}

async fn mastery_step(
    session: &mut LessonSession,
    term: &mut Terminal,
) -> Result<Option<Navigation>, Box<dyn std::error::Error>> {
    println!("{}", session.controller().lesson().activity().body);
    let Some(input) = term.ask("Did you complete the activity? (y)es, (b)ack, (q)uit").await?
    else {
        return Ok(Some(Navigation::Exit(session.path().topic_path())));
    };
    let update = match input.as_str() {
        "y" => session.advance().await?,
        "b" => session.retreat().await,
        "q" => return Ok(Some(Navigation::Exit(session.path().topic_path()))),
        _ => return Ok(None),
    };
    term.report(&update);
    Ok(update.navigation)
}

async fn evaluation_step(
    services: &AppServices,
    session: &mut LessonSession,
    term: &mut Terminal,
) -> Result<Option<Navigation>, Box<dyn std::error::Error>> {
    let methods: Vec<EvaluationMethod> = session.controller().lesson().methods().to_vec();
    let done = session.progress().completed_methods;
    let open: Vec<&EvaluationMethod> = methods
        .iter()
        .filter(|m| !done.contains(&m.method_type()))
        .collect();

    for (i, method) in open.iter().enumerate() {
        println!("{}. {} ({} points)", i + 1, method.method_type(), format_points(method.points()));
    }
    let Some(input) = term.ask("Pick an evaluation, (b)ack or (q)uit").await? else {
        return Ok(Some(Navigation::Exit(session.path().topic_path())));
    };
    let method = match input.as_str() {
        "b" => {
            let update = session.retreat().await;
            term.report(&update);
            return Ok(update.navigation);
        }
        "q" => return Ok(Some(Navigation::Exit(session.path().topic_path()))),
        raw => match raw.parse::<usize>().ok().and_then(|n| open.get(n.wrapping_sub(1))) {
            Some(method) => (*method).clone(),
            None => return Ok(None),
        },
    };

    let score = match &method {
        EvaluationMethod::Quiz(quiz) => run_quiz(QuizAttempt::from_method(quiz)?, term).await?,
        EvaluationMethod::Ai(ai) => {
            let tutor = services.tutor();
            run_ai(AiEvaluationSession::new(ai.clone()), tutor.as_ref(), term).await?
        }
    };
    let Some(score) = score else {
        return Ok(None);
    };
    let update = session
        .record_evaluation_result(method.method_type(), score)
        .await?;
    term.report(&update);
    Ok(update.navigation)
}

fn parse_response(question: &Question, raw: &str) -> Option<Response> {
    match question {
        Question::Single(_) => raw.parse::<usize>().ok()?.checked_sub(1).map(Response::Choice),
        Question::Multiple(_) => raw
            .split([',', ' '])
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<usize>().ok()?.checked_sub(1))
            .collect::<Option<BTreeSet<usize>>>()
            .map(Response::Choices),
        Question::Text(_) => Some(Response::Text(raw.to_owned())),
    }
}

async fn run_quiz(
    mut attempt: QuizAttempt,
    term: &mut Terminal,
) -> Result<Option<f64>, Box<dyn std::error::Error>> {
    while let Some(question) = attempt.current_question().cloned() {
        println!(
            "\nQuestion {}/{} [{}]\n{}",
            attempt.current_index() + 1,
            attempt.quiz().question_count(),
            question.kind(),
            question.prompt()
        );
        for (i, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", i + 1);
        }
        let Some(raw) = term.ask("Your answer:").await? else {
            return Ok(None);
        };
        let Some(response) = parse_response(&question, &raw) else {
            println!("Answer with option numbers, e.g. 1 or 1,3");
            continue;
        };
        match attempt.submit(&response) {
            Ok(true) => println!("Correct!"),
            Ok(false) => println!("Not quite."),
            Err(err) => {
                println!("{err}");
                continue;
            }
        }
        if attempt.next()? == QuizStep::Finished {
            break;
        }
    }

    let Some(outcome) = attempt.outcome() else {
        return Ok(None);
    };
    println!(
        "\nYou got {}/{} ({:.0}%), {} points. {}",
        outcome.correct,
        outcome.total,
        outcome.percentage,
        format_points(outcome.score),
        outcome.feedback.message()
    );
    if let Some(badge) = outcome.badge() {
        println!("  ** {} {}", badge.title, badge.message);
    }
    term.flush_notifications();
    Ok(Some(outcome.score))
}

async fn run_ai(
    mut session: AiEvaluationSession,
    tutor: &dyn TextCompletion,
    term: &mut Terminal,
) -> Result<Option<f64>, Box<dyn std::error::Error>> {
    if let Some(opening) = session.attempt().transcript().first() {
        println!("Tutor: {}", opening.content);
    }
    let images = session.attempt().method().accepts(SupportedInput::Image);
    let hint = if images {
        "Your answer (add +img to attach a photo):"
    } else {
        "Your answer:"
    };

    while !session.attempt().is_complete() {
        let Some(raw) = term.ask(hint).await? else {
            return Ok(None);
        };
        let (text, image_count) = match raw.strip_suffix("+img") {
            Some(text) if images => (text.trim().to_owned(), 1),
            _ => (raw, 0),
        };
        let turn = LearnerTurn::text(text).with_images(image_count);
        match session.submit(tutor, &turn).await {
            Ok(EvaluationReply::Answered(score)) => {
                if let Some(reply) = session
                    .attempt()
                    .transcript()
                    .iter()
                    .rev()
                    .find(|m| m.role == ChatRole::Assistant)
                {
                    println!("Tutor: {}", reply.content);
                }
                println!("  score {}", format_points(score.score));
            }
            Ok(EvaluationReply::Fallback) => {
                if let Some(last) = session.attempt().transcript().last() {
                    println!("Tutor: {}", last.content);
                }
            }
            Err(err) => println!("{err}"),
        }
    }
    Ok(Some(session.attempt().score()))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        if db.trim().is_empty() {
            return Err(ArgsError::InvalidDbUrl { raw: db }.into());
        }
        config.db_url = db;
    }
    config.db_url = normalize_sqlite_url(config.db_url);
    if let Some(student) = cli.student {
        config.student_id = student;
    }

    if let Command::CheckQuiz { file } = &cli.command {
        let raw = std::fs::read_to_string(file)?;
        let quiz = gurukul_core::quiz::parse(&raw)?;
        println!("{}", serde_json::to_string_pretty(&quiz)?);
        return Ok(());
    }

    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(&config, Clock::default()).await?;

    match cli.command {
        Command::Play {
            lesson,
            subject,
            topic,
        } => play(&services, LessonPath::new(subject, topic, lesson)).await,
        Command::Seed => {
            let (lesson, student) = services.seed_sample().await?;
            println!(
                "seeded lesson {} ({} sections, {} evaluation points) for {} (id {})",
                lesson.id(),
                lesson.section_count(),
                format_points(lesson.evaluation_points()),
                student.name,
                student.id
            );
            Ok(())
        }
        Command::Student => {
            let student = services.students().summary(services.student_id()).await?;
            println!(
                "{} (id {}): {} points, level {}",
                student.name, student.id, student.points, student.level
            );
            Ok(())
        }
        Command::CheckQuiz { .. } => Ok(()),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,services=info,app=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_relative_paths() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/g.sqlite3".into()),
            "sqlite:///tmp/g.sqlite3"
        );
        assert_eq!(normalize_sqlite_url("/tmp/g.sqlite3".into()), "sqlite:///tmp/g.sqlite3");
        assert!(normalize_sqlite_url("g.sqlite3".into()).ends_with("/g.sqlite3"));
    }

    #[test]
    fn parses_terminal_answers() {
        let quiz = gurukul_core::quiz::parse(
            "[single]\nQ\n- (x) A\n- ( ) B\n[multiple]\nQ\n- [x] A\n- [x] B\n[text]\nQ\nR:= a",
        )
        .unwrap();
        assert_eq!(parse_response(&quiz.questions[0], "2"), Some(Response::Choice(1)));
        assert_eq!(parse_response(&quiz.questions[0], "0"), None);
        assert_eq!(
            parse_response(&quiz.questions[1], "1, 2"),
            Some(Response::Choices([0, 1].into_iter().collect()))
        );
        assert_eq!(
            parse_response(&quiz.questions[2], "a"),
            Some(Response::Text("a".into()))
        );
    }

    #[test]
    fn cli_parses_play_defaults() {
        let cli = Cli::try_parse_from(["gurukul", "play", "--student", "7"]).unwrap();
        assert_eq!(cli.student, Some(StudentId::new(7)));
        match cli.command {
            Command::Play { lesson, subject, .. } => {
                assert_eq!(lesson.as_str(), "introduction-to-gravity");
                assert_eq!(subject, "science");
            }
            _ => panic!("expected play"),
        }
    }
}
