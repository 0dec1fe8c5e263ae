// dbvault/src/restore/db_restore.rs
use std::path::Path;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::utils::pg_client_command;
use crate::utils::process::{CommandSpec, Pipeline, ToolRunner, run_checked};
use crate::utils::silent_remove_file;
use crate::utils::workspace::RunContext;

pub const DECRYPT_STEP: &str = "Decrypt dump";
pub const DECOMPRESS_STEP: &str = "Decompress dump";
pub const LOAD_STEP: &str = "Load database";

/// `openssl smime -decrypt` of the downloaded artifact into `output`.
pub fn decrypt_pipeline(input: &Path, output: &Path, private_key: &Path) -> Pipeline {
    Pipeline::single(
        DECRYPT_STEP,
        CommandSpec::new("openssl")
            .args(["smime", "-decrypt", "-in"])
            .arg(input.display().to_string())
            .args(["-binary", "-inform", "DEM", "-inkey"])
            .arg(private_key.display().to_string())
            .arg("-out")
            .arg(output.display().to_string()),
    )
}

/// `gzip -d -c <input> > <output>`
pub fn decompress_pipeline(input: &Path, output: &Path) -> Pipeline {
    Pipeline::single(
        DECOMPRESS_STEP,
        CommandSpec::new("gzip")
            .args(["-d", "-c"])
            .arg(input.display().to_string())
            .stdout_to(output),
    )
}

/// `psql ... <db> < <dump>`
pub fn load_pipeline(db: &DatabaseConfig, dump: &Path, stop_on_error: bool) -> Pipeline {
    let mut psql = pg_client_command("psql", db).args(["-X", "-q"]);
    if stop_on_error {
        psql = psql.args(["-v", "ON_ERROR_STOP=1"]);
    }
    Pipeline::single(LOAD_STEP, psql.arg(db.name.clone()).stdin_from(dump))
}

pub fn decrypt_dump(runner: &dyn ToolRunner, ctx: &RunContext, private_key: &Path) -> Result<()> {
    run_checked(
        runner,
        &decrypt_pipeline(&ctx.encrypted_dump, &ctx.compressed_dump, private_key),
    )?;
    println!("🔑 Database decrypted");
    Ok(())
}

pub fn decompress_dump(runner: &dyn ToolRunner, ctx: &RunContext) -> Result<()> {
    silent_remove_file(&ctx.plain_dump)?;
    run_checked(runner, &decompress_pipeline(&ctx.compressed_dump, &ctx.plain_dump))?;
    println!("📤 Database unzipped");
    Ok(())
}

pub fn load_dump(
    runner: &dyn ToolRunner,
    db: &DatabaseConfig,
    ctx: &RunContext,
    stop_on_error: bool,
) -> Result<()> {
    println!("💤 Database load started");
    run_checked(runner, &load_pipeline(db, &ctx.plain_dump, stop_on_error))?;
    println!("🤖 Database loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::db_dump::compress_and_encrypt;
    use crate::utils::process::SystemRunner;

    fn database() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            name: "shop".to_string(),
            user: "postgres".to_string(),
            password: Some("pw".to_string()),
            schema: "public".to_string(),
        }
    }

    #[test]
    fn test_restore_pipelines_render_expected_commands() {
        let ctx = RunContext::new(Path::new("/tmp"));
        let key = Path::new("/keys/backup_key.pem");

        assert_eq!(
            decrypt_pipeline(&ctx.encrypted_dump, &ctx.compressed_dump, key).to_string(),
            "openssl smime -decrypt -in /tmp/backup_db.sql.gz.enc -binary -inform DEM \
             -inkey /keys/backup_key.pem -out /tmp/db.sql.gz"
        );
        assert_eq!(
            decompress_pipeline(&ctx.compressed_dump, &ctx.plain_dump).to_string(),
            "gzip -d -c /tmp/db.sql.gz > /tmp/db.sql"
        );
        assert_eq!(
            load_pipeline(&database(), &ctx.plain_dump, false).to_string(),
            "psql -h localhost -p 5432 -U postgres -X -q shop < /tmp/db.sql"
        );
        assert_eq!(
            load_pipeline(&database(), &ctx.plain_dump, true).to_string(),
            "psql -h localhost -p 5432 -U postgres -X -q -v ON_ERROR_STOP=1 shop < /tmp/db.sql"
        );
    }

    #[test]
    fn test_load_passes_password_through_environment() {
        let pipeline = load_pipeline(&database(), Path::new("/tmp/db.sql"), false);
        assert_eq!(pipeline.stages[0].env, [("PGPASSWORD".to_string(), "pw".to_string())]);
    }

    /// Dump text → gzip → openssl encrypt, then decrypt → gunzip, with the real tools.
    #[cfg(unix)]
    #[test]
    fn test_encrypt_then_decrypt_round_trip() -> anyhow::Result<()> {
        if which::which("openssl").is_err() || which::which("gzip").is_err() {
            return Ok(());
        }
        let dir = tempfile::tempdir()?;
        let ctx = RunContext::new(dir.path());
        let private_key = dir.path().join("backup_key.pem");
        let public_key = dir.path().join("backup_key.pem.pub");

        let keygen = Pipeline::single(
            "Generate keypair",
            CommandSpec::new("openssl")
                .args(["req", "-x509", "-nodes", "-days", "1", "-newkey", "rsa:2048"])
                .args(["-subj", "/CN=dbvault-test", "-keyout"])
                .arg(private_key.display().to_string())
                .arg("-out")
                .arg(public_key.display().to_string()),
        );
        run_checked(&SystemRunner, &keygen)?;

        let original = dir.path().join("original.sql");
        let mut dump = String::from("--\n-- PostgreSQL database dump\n--\n");
        for i in 0..500 {
            dump.push_str(&format!(
                "INSERT INTO public.orders VALUES ({}, 'naïve ☕ {}');\n",
                i, i
            ));
        }
        std::fs::write(&original, &dump)?;

        let source = CommandSpec::new("cat").stdin_from(&original);
        let encrypt = compress_and_encrypt(source, &ctx.encrypted_dump, &public_key);
        run_checked(&SystemRunner, &encrypt)?;
        assert!(ctx.encrypted_dump.exists());

        decrypt_dump(&SystemRunner, &ctx, &private_key)?;
        decompress_dump(&SystemRunner, &ctx)?;

        assert_eq!(std::fs::read(&ctx.plain_dump)?, dump.into_bytes());
        ctx.cleanup()?;
        Ok(())
    }
}
