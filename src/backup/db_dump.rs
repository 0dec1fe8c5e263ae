// dbvault/src/backup/db_dump.rs
use std::path::Path;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::utils::pg_client_command;
use crate::utils::process::{CommandSpec, Pipeline, ToolRunner, run_checked};
use crate::utils::workspace::RunContext;

pub const DUMP_STEP: &str = "Dump database";

/// `pg_dump` for the configured database, plain SQL to stdout.
pub fn pg_dump_command(db: &DatabaseConfig) -> CommandSpec {
    pg_client_command("pg_dump", db).arg(db.name.clone())
}

/// `<source> | gzip -c --best | openssl smime -encrypt ... -out <output> <public_key>`
///
/// The source stage is anything that writes the plain dump to stdout.
pub fn compress_and_encrypt(source: CommandSpec, output: &Path, public_key: &Path) -> Pipeline {
    Pipeline::new(
        DUMP_STEP,
        vec![
            source,
            CommandSpec::new("gzip").args(["-c", "--best"]),
            CommandSpec::new("openssl")
                .args(["smime", "-encrypt", "-aes256", "-binary", "-outform", "DEM", "-out"])
                .arg(output.display().to_string())
                .arg(public_key.display().to_string()),
        ],
    )
}

pub fn dump_pipeline(db: &DatabaseConfig, ctx: &RunContext, public_key: &Path) -> Pipeline {
    compress_and_encrypt(pg_dump_command(db), &ctx.encrypted_dump, public_key)
}

/// Dumps, compresses and encrypts the database into `ctx.encrypted_dump`.
pub fn dump_database(
    runner: &dyn ToolRunner,
    db: &DatabaseConfig,
    ctx: &RunContext,
    public_key: &Path,
) -> Result<()> {
    println!("📦 Preparing database backup started");
    run_checked(runner, &dump_pipeline(db, ctx, public_key))?;
    println!("🔐 DB dumped, archived and encoded");
    Ok(())
}
