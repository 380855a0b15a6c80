use anyhow::{bail, Result};

use super::{check_reply, connect};

pub async fn request() -> Result<()> {
    let proxy = connect().await?;

    let question = proxy.request_challenge().await?;
    if let Some(reason) = question.strip_prefix("error:") {
        bail!("no challenge available: {}", reason);
    }

    println!("{}", question);
    println!("Answer with: focusguard-ctl answer <value>");

    Ok(())
}

pub async fn answer(value: i64) -> Result<()> {
    let proxy = connect().await?;

    match proxy.submit_answer(value).await?.as_str() {
        "correct" => println!("Correct! Extra time granted."),
        "incorrect" => println!("Incorrect, try again."),
        _ => println!("There is no problem to answer."),
    }

    Ok(())
}

pub async fn take_break() -> Result<()> {
    let proxy = connect().await?;

    if proxy.take_break().await? {
        println!("Break recorded. See you later!");
    } else {
        println!("Nothing is blocked right now.");
    }

    Ok(())
}

pub async fn skip() -> Result<()> {
    let proxy = connect().await?;

    if proxy.skip_challenge().await? {
        println!("Problem skipped, break recorded.");
    } else {
        println!("Nothing is blocked right now.");
    }

    Ok(())
}

pub async fn set_difficulty(level: &str) -> Result<()> {
    let proxy = connect().await?;

    check_reply(&proxy.set_difficulty(level).await?)?;
    println!("Difficulty set to {}", level.to_uppercase());

    Ok(())
}
