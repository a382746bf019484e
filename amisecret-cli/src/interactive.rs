use std::io::{self, Write};

use anyhow::{bail, Context, Result};

use amisecret_db::models::Strategy;
use amisecret_engine::session::Session;

use crate::config::Settings;
use crate::export::ExportFormat;

#[derive(Debug, PartialEq)]
enum InteractiveCommand {
    Add,
    Remove,
    List,
    Strategy,
    Draw,
    History,
    Stats,
    Insights,
    Export,
    Clear,
    Quit,
}

fn parse_command(input: &str) -> Option<InteractiveCommand> {
    match input.trim().to_lowercase().as_str() {
        "1" | "ajouter" | "add" => Some(InteractiveCommand::Add),
        "2" | "retirer" | "remove" | "rm" => Some(InteractiveCommand::Remove),
        "3" | "liste" | "list" | "ls" => Some(InteractiveCommand::List),
        "4" | "strategie" | "stratégie" | "strategy" | "strat" => Some(InteractiveCommand::Strategy),
        "5" | "tirer" | "draw" | "tirage" => Some(InteractiveCommand::Draw),
        "6" | "historique" | "history" | "hist" => Some(InteractiveCommand::History),
        "7" | "stats" | "statistiques" => Some(InteractiveCommand::Stats),
        "8" | "analyse" | "insights" => Some(InteractiveCommand::Insights),
        "9" | "exporter" | "export" => Some(InteractiveCommand::Export),
        "10" | "effacer" | "clear" => Some(InteractiveCommand::Clear),
        "11" | "quitter" | "quit" | "q" | "exit" => Some(InteractiveCommand::Quit),
        _ => None,
    }
}

fn display_menu(session: &Session) {
    println!();
    println!(
        "── Ami secret ── {} participant(s), stratégie : {}",
        session.participants().len(),
        session.strategy()
    );
    println!("   1. ajouter     Ajouter un participant");
    println!("   2. retirer     Retirer un participant");
    println!("   3. liste       Participants et victoires");
    println!("   4. strategie   Choisir la stratégie");
    println!("   5. tirer       Tirer un ami secret");
    println!("   6. historique  Derniers tirages");
    println!("   7. stats       Statistiques et équité");
    println!("   8. analyse     Analyse de l'historique");
    println!("   9. exporter    Exporter (JSON/CSV)");
    println!("  10. effacer     Effacer l'historique");
    println!("  11. quitter     Quitter");
    println!();
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    if read == 0 {
        bail!("Fin de l'entrée");
    }
    Ok(input.trim().to_string())
}

fn prompt_with_default(msg: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}] : ", msg, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

fn parse_strategy_choice(input: &str) -> Option<Strategy> {
    if let Ok(n) = input.trim().parse::<usize>() {
        return n.checked_sub(1).and_then(|i| Strategy::ALL.get(i).copied());
    }
    input.trim().to_lowercase().parse().ok()
}

fn parse_export_format(input: &str) -> Option<ExportFormat> {
    match input.trim().to_lowercase().as_str() {
        "json" | "j" => Some(ExportFormat::Json),
        "csv" | "c" => Some(ExportFormat::Csv),
        _ => None,
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "o" | "oui" | "y" | "yes")
}

fn cmd_strategy_interactive(session: &mut Session) -> Result<()> {
    crate::display::display_strategies(session.strategy());
    for (i, strategy) in Strategy::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, strategy);
    }
    let input = prompt_with_default("Stratégie", session.strategy().as_str())?;
    match parse_strategy_choice(&input) {
        Some(strategy) => super::cmd_strategy(session, Some(strategy)),
        None => bail!("Stratégie inconnue : '{}'", input),
    }
}

fn cmd_export_interactive(session: &Session) -> Result<()> {
    let input = prompt_with_default("Format (json/csv)", "json")?;
    let Some(format) = parse_export_format(&input) else {
        bail!("Format inconnu : '{}'", input);
    };
    super::cmd_export(session, format, None)
}

fn cmd_clear_interactive(session: &mut Session) -> Result<()> {
    if session.history().is_empty() {
        println!("Aucun tirage à effacer.");
        return Ok(());
    }
    let answer = prompt(&format!(
        "Effacer les {} tirage(s) de l'historique ? (o/n) : ",
        session.history().len()
    ))?;
    if is_yes(&answer) {
        super::cmd_clear(session)
    } else {
        println!("Historique conservé.");
        Ok(())
    }
}

pub fn run_interactive(session: &mut Session, settings: &Settings) -> Result<()> {
    println!("Bienvenue dans le mode interactif d'amisecret !");

    loop {
        display_menu(session);
        let input = match prompt("> ") {
            Ok(s) => s,
            Err(_) => break, // EOF / Ctrl+D
        };

        if input.is_empty() {
            continue;
        }

        let result = match parse_command(&input) {
            Some(InteractiveCommand::Quit) => {
                println!("Au revoir !");
                break;
            }
            Some(InteractiveCommand::Add) => {
                prompt("Nom : ").and_then(|name| super::cmd_add(session, &name))
            }
            Some(InteractiveCommand::Remove) => {
                prompt("Nom à retirer : ").and_then(|name| super::cmd_remove(session, &name))
            }
            Some(InteractiveCommand::List) => super::cmd_list(session),
            Some(InteractiveCommand::Strategy) => cmd_strategy_interactive(session),
            Some(InteractiveCommand::Draw) => super::cmd_draw(session, None, settings.reveal_delay()),
            Some(InteractiveCommand::History) => super::cmd_history(session, settings.history_last),
            Some(InteractiveCommand::Stats) => super::cmd_stats(session),
            Some(InteractiveCommand::Insights) => super::cmd_insights(session),
            Some(InteractiveCommand::Export) => cmd_export_interactive(session),
            Some(InteractiveCommand::Clear) => cmd_clear_interactive(session),
            None => {
                println!("Commande inconnue : '{}'. Tapez un numéro (1-11) ou un nom de commande.", input);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Erreur: {e:#}");
        }
        super::report_persistence(session);
    }

    Ok(())
}
