use load::config::Config;

pub fn show(config: &Config, var: Option<&str>, explain: bool) -> anyhow::Result<()> {
    let mut rows = config.describe();
    if let Some(name) = var {
        rows.retain(|(candidate, ..)| candidate.eq_ignore_ascii_case(name));
        if rows.is_empty() {
            anyhow::bail!("unknown configuration variable '{name}'");
        }
    }

    for (name, value, description) in rows {
        match value {
            Some(value) => println!("{name}={value}"),
            None => println!("{name} is unset"),
        }
        if explain {
            println!("  {description}");
        }
    }
    Ok(())
}
