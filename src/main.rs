use std::{
    error::Error,
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use clap::{Parser, Subcommand};
use crossbeam_channel::{select, Receiver};
use log::{debug, info, warn};
use pill_clock::{
    audio::{Ringer, RodioRinger, SilentRinger},
    config::Config,
    AlarmError, AlarmStore, Event, Scheduler,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// config file to use instead of the default one
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// alarms file to use instead of the one from the config
    #[clap(long, global = true)]
    file: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// add a reminder, TIME is HH:MM (24 hour clock)
    Add {
        name: String,
        dose: String,
        time: String,
    },
    /// show the reminders that haven't gone off yet
    List,
    /// delete the reminder with the number shown by `list`
    Remove { number: usize },
    /// wait for reminders to go off (the default)
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("pill_clock")
        .map_err(|e| format!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(Config::config_path);
    let file = args.file;
    let settings = || -> Result<(Config, PathBuf), AlarmError> {
        let config = Config::load(&config_path)?;
        let alarms_file = file.clone().unwrap_or_else(|| config.alarms_file.clone());
        info!("using alarms file {}", alarms_file.display());
        Ok((config, alarms_file))
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Init { force } => init(&config_path, force)?,
        Command::Add { name, dose, time } => {
            let store = AlarmStore::open(settings()?.1);
            match store.add(name, dose, &time) {
                Ok(alarm) => println!("Alarm set for {} at {}", alarm.name, alarm.time),
                Err(e) => println!("{e}"),
            }
        }
        Command::List => print_alarms(&AlarmStore::open(settings()?.1)),
        Command::Remove { number } => delete_alarm(&AlarmStore::open(settings()?.1), number),
        Command::Run => {
            let (config, alarms_file) = settings()?;
            run(&config, alarms_file)?;
        }
    }
    Ok(())
}

fn init(config_path: &Path, force: bool) -> Result<(), Box<dyn Error>> {
    if force || !config_path.exists() {
        Config::new().save(config_path)?;
        if let Some(sounds) = Config::sounds_path() {
            std::fs::create_dir_all(sounds)?;
        }
        println!("wrote config to {}", config_path.display());
    } else {
        println!(
            "config already exists at {}, use --force to overwrite it",
            config_path.display()
        );
    }
    Ok(())
}

fn run(config: &Config, alarms_file: PathBuf) -> Result<(), Box<dyn Error>> {
    let (event_tx, events) = crossbeam_channel::unbounded();
    let store = Arc::new(AlarmStore::open(alarms_file).with_events(event_tx.clone()));
    let scheduler = Scheduler::new(Arc::clone(&store))
        .with_period(config.poll_interval())
        .with_events(event_tx)
        .spawn()?;
    let mut ringer = ringer(config);
    let mut lines = read_lines();

    println!("{} reminder(s) waiting, type `help` for commands", store.len());
    loop {
        let mut stdin_closed = false;
        select! {
            recv(events) -> event => match event {
                Ok(event) => on_event(event, ringer.as_mut()),
                Err(_) => break,
            },
            recv(lines) -> line => match line {
                Ok(line) => {
                    if handle_line(&line, &store, ringer.as_mut()) == Flow::Quit {
                        break;
                    }
                }
                Err(_) => stdin_closed = true,
            },
        }
        if stdin_closed {
            // keep ringing reminders without a prompt
            lines = crossbeam_channel::never();
        }
    }

    ringer.stop();
    scheduler.stop();
    Ok(())
}

fn ringer(config: &Config) -> Box<dyn Ringer> {
    let Some(sound) = config.sound_file().filter(|sound| sound.exists()) else {
        warn!("no alarm sound found, reminders will be silent");
        return Box::new(SilentRinger::default());
    };
    match RodioRinger::open(sound, config.volume_fraction()) {
        Ok(ringer) => Box::new(ringer),
        Err(e) => {
            warn!("{e}, reminders will be silent");
            Box::new(SilentRinger::default())
        }
    }
}

fn read_lines() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn on_event(event: Event, ringer: &mut dyn Ringer) {
    match event {
        Event::AlarmFired(alarm) => {
            println!("\nTime to Take Your Medicine!\n{}", alarm.reminder());
            println!("type `stop` to silence the alarm");
            if let Err(e) = ringer.start() {
                warn!("{e}");
                println!("couldn't play the alarm sound: {e}");
            }
        }
        Event::AlarmAdded(alarm) => println!("Alarm set for {} at {}", alarm.name, alarm.time),
        Event::AlarmRejected(reason) => println!("{reason}"),
        Event::AlarmsChanged(alarms) => debug!("{} reminder(s) left", alarms.len()),
        Event::PersistenceFailed(reason) => eprintln!("warning: {reason}"),
    }
}

fn handle_line(line: &str, store: &AlarmStore, ringer: &mut dyn Ringer) -> Flow {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "" => {}
        "add" => {
            let parts: Vec<_> = rest.split(',').map(str::trim).collect();
            if let [name, dose, time] = parts[..] {
                // the outcome is reported through the store's events
                if let Err(e) = store.add(name, dose, time) {
                    debug!("add failed: {e}");
                }
            } else {
                println!("usage: add NAME, DOSE, HH:MM");
            }
        }
        "list" => print_alarms(store),
        "delete" => match rest.trim().parse() {
            Ok(number) => delete_alarm(store, number),
            Err(_) => println!("usage: delete NUMBER"),
        },
        "stop" => ringer.stop(),
        "quit" | "exit" => return Flow::Quit,
        "help" => {
            println!("add NAME, DOSE, HH:MM   set a reminder");
            println!("list                    show reminders");
            println!("delete NUMBER           delete a reminder");
            println!("stop                    silence the alarm");
            println!("quit                    exit");
        }
        other => println!("unknown command {other:?}, type `help` for commands"),
    }
    Flow::Continue
}

fn print_alarms(store: &AlarmStore) {
    let alarms = store.alarms();
    if alarms.is_empty() {
        println!("No alarms set.");
    }
    for (i, alarm) in alarms.iter().enumerate() {
        println!("{}. {alarm}", i + 1);
    }
}

fn delete_alarm(store: &AlarmStore, number: usize) {
    let Some(alarm) = number
        .checked_sub(1)
        .and_then(|i| store.alarms().get(i).cloned())
    else {
        println!("there is no alarm number {number}");
        return;
    };
    match store.remove(alarm.id()) {
        Ok(alarm) => println!("Deleted {alarm}"),
        Err(AlarmError::NotFound(_)) => println!("That alarm has already gone off or been deleted."),
        Err(e) => println!("{e}"),
    }
}
