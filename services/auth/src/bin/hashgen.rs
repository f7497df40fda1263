//! Generate a password hash for manual inserts into `users.password_hash`
//!
//! Usage: `hashgen <password> [work_factor]`

use anyhow::{Context, Result, bail};
use internado_auth::hasher::{BcryptHasher, DEFAULT_WORK_FACTOR, encode_for_storage};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);

    let Some(password) = args.next() else {
        bail!("usage: hashgen <password> [work_factor]");
    };

    let work_factor = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("work factor is not a number: {}", raw))?,
        None => DEFAULT_WORK_FACTOR,
    };

    let text = BcryptHasher::hash_text(&password, work_factor)?;
    let stored = encode_for_storage(&text);
    let hex: String = text.bytes().map(|b| format!("{:02X}", b)).collect();

    println!("bcrypt:  {}", text);
    println!("base64:  {}", stored);
    println!("sql:     0x{}", hex);
    println!("length:  {} bytes", text.len());

    Ok(())
}
