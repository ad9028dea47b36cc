//! `hipops show` - print the configuration

use anyhow::{Context as AnyhowContext, Result};
use deployment::{App, Configuration, Playbook, Server, playbook_label};

use crate::Context;
use crate::cli::ShowArgs;
use crate::ui;

pub fn run(_ctx: &Context, args: &ShowArgs) -> Result<()> {
    let config = if args.raw {
        super::load(&args.config)?
    } else {
        super::load_resolved(&args.config, super::mode(args.lenient))?
    };

    if args.json {
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
        println!("{json}");
        return Ok(());
    }

    print_config(&config);
    for warning in config.validate() {
        ui::warn(&warning.to_string());
    }
    Ok(())
}

fn print_config(config: &Configuration) {
    ui::header("Configuration");
    ui::kv("Id", ui::or_empty(&config.id));
    ui::kv("Env", ui::or_empty(&config.env));

    ui::section(&format!("Apps ({})", config.apps.len()));
    for app in &config.apps {
        print_app(config, app);
    }

    ui::section(&format!("Servers ({})", config.servers.len()));
    for server in &config.servers {
        print_server(server);
    }

    ui::section(&format!("Playbooks ({})", config.playbooks.len()));
    for (index, playbook) in config.playbooks.iter().enumerate() {
        print_playbook(index, playbook);
    }
}

fn print_app(config: &Configuration, app: &App) {
    println!();
    println!("  {}", ui::or_empty(&app.name));
    for (key, value) in [
        ("Type", &app.kind),
        ("Repo", &app.repo),
        ("Branch", &app.branch),
        ("SshKey", &app.ssh_key),
        ("Data", &app.data),
        ("Image", &app.image),
        ("Host", &app.host),
        ("Config", &app.config),
        ("Start", &app.start),
    ] {
        if !value.is_empty() {
            ui::kv(key, value);
        }
    }
    if !app.ports.is_empty() {
        ui::kv("Ports", &join(app.ports.iter()));
    }
    let roles = join(config.servers_hosting(&app.name).map(|s| s.role.as_str()));
    if !roles.is_empty() {
        ui::kv("Servers", &roles);
    }
}

fn print_server(server: &Server) {
    println!();
    println!("  {}", ui::or_empty(&server.role));
    if !server.kind.is_empty() {
        ui::kv("Type", &server.kind);
    }
    ui::kv("Apps", ui::or_empty(&join(server.apps.iter())));
}

fn print_playbook(index: usize, playbook: &Playbook) {
    println!();
    println!("  {}", playbook_label(index, &playbook.name, &playbook.play));
    ui::kv("Play", ui::or_empty(&playbook.play));
    ui::kv("App", ui::or_empty(&playbook.app));
    ui::kv("Inventory", ui::or_empty(&playbook.inventory));
    ui::kv("State", ui::or_empty(&playbook.state));
    for (n, action) in playbook.actions.iter().enumerate() {
        let mut line = action.image.clone();
        if !action.params.is_empty() {
            line.push(' ');
            line.push_str(&action.params);
        }
        if n > 0 {
            line.push_str(" (unused)");
        }
        ui::kv("Action", ui::or_empty(&line));
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join([80u16, 443].iter()), "80, 443");
        assert_eq!(join(std::iter::empty::<&str>()), "");
    }
}
