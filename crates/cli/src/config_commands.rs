use {anyhow::Result, clap::Subcommand, talkshop_config::TalkShopConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print where configuration files are searched for.
    Path,
}

pub fn handle_config(action: ConfigAction, config: &TalkShopConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", talkshop_config::to_toml_string(config)?);
        },
        ConfigAction::Path => {
            println!("./talkshop.{{toml,yaml,yml,json}}");
            match talkshop_config::config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => eprintln!("no home directory, only ./ is searched"),
            }
        },
    }
    Ok(())
}
