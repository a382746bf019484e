mod config;
mod display;
mod export;
mod interactive;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use amisecret_db::db::{count_draws, migrate, open_db, MemoryStore, StateStore};
use amisecret_db::error::CoreError;
use amisecret_db::models::Strategy;
use amisecret_engine::fairness::draws_per_day;
use amisecret_engine::random::Entropy;
use amisecret_engine::session::Session;

use crate::config::resolve_settings;
use crate::display::{
    display_history, display_insights, display_participants, display_stats, display_strategies,
    display_timeline, ConsoleObserver,
};
use crate::export::ExportFormat;

#[derive(Parser)]
#[command(name = "amisecret", about = "Tirage d'ami secret avec analyse d'équité")]
struct Cli {
    /// Fichier de configuration JSON (défaut : amisecret.json s'il existe)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base SQLite (remplace celle de la configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ajouter un participant
    Add {
        /// Nom (50 caractères maximum)
        name: String,
    },

    /// Retirer un participant
    Remove {
        name: String,
    },

    /// Lister les participants
    List,

    /// Afficher ou choisir la stratégie de tirage par défaut
    Strategy {
        strategy: Option<Strategy>,
    },

    /// Tirer un ami secret
    Draw {
        /// Stratégie pour ce tirage uniquement
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Seed pour la reproductibilité (stratégies non sécurisées)
        #[arg(long)]
        seed: Option<u64>,

        /// Révéler le résultat sans pause
        #[arg(long)]
        no_pause: bool,
    },

    /// Historique des derniers tirages
    History {
        /// Nombre de tirages à afficher
        #[arg(short, long)]
        last: Option<u32>,
    },

    /// Statistiques : équité, victoires, stratégies, tirages par jour
    Stats,

    /// Analyse de l'historique (à partir de 5 tirages)
    Insights,

    /// Effacer l'historique des tirages
    Clear,

    /// Exporter les données
    Export {
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Fichier de sortie (défaut : nom daté dans le répertoire courant)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Mode interactif (REPL)
    Interactive,
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ouvre la base ; si c'est impossible la session continue en mémoire.
fn open_store(path: &std::path::Path) -> (Box<dyn StateStore>, Option<anyhow::Error>) {
    let opened = open_db(path).and_then(|conn| {
        migrate(&conn)?;
        Ok(conn)
    });
    match opened {
        Ok(conn) => (Box::new(conn), None),
        Err(e) => (Box::new(MemoryStore::new()), Some(e)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = resolve_settings(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.database = Some(db);
    }
    init_logging(&settings.log_filter);

    let path = settings.database_path();
    if let Command::DbPath = cli.command {
        return cmd_db_path(&path);
    }

    let (store, store_error) = open_store(&path);
    if let Some(e) = store_error {
        warn!(error = %format!("{:#}", e), "base indisponible, session en mémoire");
        eprintln!("⚠ Base de données indisponible ({e:#}) : les changements ne seront pas sauvegardés.");
    }

    let seed = match &cli.command {
        Command::Draw { seed, .. } => *seed,
        _ => None,
    };
    let mut session = Session::open(store, Entropy::system(seed));
    session.observe(Box::new(ConsoleObserver));
    report_persistence(&mut session);

    let result = match cli.command {
        Command::Add { name } => cmd_add(&mut session, &name),
        Command::Remove { name } => cmd_remove(&mut session, &name),
        Command::List => cmd_list(&session),
        Command::Strategy { strategy } => cmd_strategy(&mut session, strategy),
        Command::Draw { strategy, no_pause, .. } => {
            let delay = if no_pause { Duration::ZERO } else { settings.reveal_delay() };
            cmd_draw(&mut session, strategy, delay)
        }
        Command::History { last } => cmd_history(&session, last.unwrap_or(settings.history_last)),
        Command::Stats => cmd_stats(&session),
        Command::Insights => cmd_insights(&session),
        Command::Clear => cmd_clear(&mut session),
        Command::Export { format, output } => cmd_export(&session, format, output),
        Command::DbPath => Ok(()),
        Command::Interactive => interactive::run_interactive(&mut session, &settings),
    };

    report_persistence(&mut session);
    result
}

fn cmd_db_path(path: &std::path::Path) -> Result<()> {
    println!("{}", path.display());
    if path.exists() {
        let conn = open_db(path)?;
        migrate(&conn)?;
        println!("{} tirage(s) enregistré(s)", count_draws(&conn)?);
    }
    Ok(())
}

/// Signale à l'utilisateur une sauvegarde ratée : les données ne sont qu'en mémoire.
pub(crate) fn report_persistence(session: &mut Session) {
    if let Some(issue) = session.take_persistence_issue() {
        eprintln!("⚠ {issue}. Les données de cette session risquent d'être perdues.");
    }
}

/// Les erreurs du cœur sont récupérables : on les affiche sans interrompre.
fn report_core(result: std::result::Result<(), CoreError>) -> Result<()> {
    if let Err(e) = result {
        println!("{e}");
    }
    Ok(())
}

pub(crate) fn cmd_add(session: &mut Session, name: &str) -> Result<()> {
    report_core(session.add_participant(name).map(|_| ()))
}

pub(crate) fn cmd_remove(session: &mut Session, name: &str) -> Result<()> {
    if !session.remove_participant(name) {
        println!("Participant introuvable : {}", name.trim());
    }
    Ok(())
}

pub(crate) fn cmd_list(session: &Session) -> Result<()> {
    display_participants(session.participants(), session.history());
    Ok(())
}

pub(crate) fn cmd_strategy(session: &mut Session, strategy: Option<Strategy>) -> Result<()> {
    match strategy {
        Some(s) => session.set_strategy(s),
        None => display_strategies(session.strategy()),
    }
    Ok(())
}

pub(crate) fn cmd_draw(session: &mut Session, strategy: Option<Strategy>, delay: Duration) -> Result<()> {
    let count = session.participants().len();
    if count < 2 {
        return report_core(Err(CoreError::InsufficientParticipants { count }));
    }

    if !delay.is_zero() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Gabarit de progression invalide")?);
        pb.set_message("Tirage en cours...");
        pb.enable_steady_tick(Duration::from_millis(80));
        std::thread::sleep(delay);
        pb.finish_and_clear();
    }

    report_core(session.draw(strategy).map(|_| ()))
}

pub(crate) fn cmd_history(session: &Session, last: u32) -> Result<()> {
    display_history(session.history(), last as usize);
    Ok(())
}

pub(crate) fn cmd_stats(session: &Session) -> Result<()> {
    display_stats(&session.snapshot());
    display_timeline(&draws_per_day(session.history()));
    Ok(())
}

pub(crate) fn cmd_insights(session: &Session) -> Result<()> {
    display_insights(session.insights().as_ref(), session.history().len());
    Ok(())
}

pub(crate) fn cmd_clear(session: &mut Session) -> Result<()> {
    session.clear_history();
    Ok(())
}

pub(crate) fn cmd_export(session: &Session, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let path = export::export(&session.snapshot(), format, output.as_deref())?;
    println!("Données exportées dans : {}", path.display());
    Ok(())
}
