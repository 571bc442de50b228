use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use serde::Serialize;
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use super::{cleanup, render};
use crate::{
    api::{
        barcode::{
            decode_file, default_ladder, DecodeConfig, DirectoryFrameSource, ExternalDecoder,
            StreamControl, StreamHandle, StreamOutcome, NOT_FOUND_MESSAGE,
        },
        scan::{PollControl, PollEvent, ScanSubmitter, ScanWorkflow},
        services::CompareSelection,
        BarcodeDecoder,
    },
    core::{
        config::ClientConfig,
        session::SessionStore,
        task_manager::{spawn_blocking_task, spawn_task},
    },
    protocol::{
        types::{Role, UpdateProfileRequest},
        ApiClient,
    },
};

/// Everything a command handler needs
pub struct CliContext {
    pub config: ClientConfig,
    pub client: Arc<ApiClient>,
    pub json: bool,
}

impl CliContext {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config =
            ClientConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
        if let Some(url) = matches.get_one::<String>("api-url") {
            config.set_base_url(url)?;
        }

        let session = Arc::new(SessionStore::load(config.session_path())?);
        let client = Arc::new(ApiClient::from_config(&config, session)?);
        log::debug!("Using backend {}", client.base_url());

        Ok(Self {
            config,
            client,
            json: matches.get_flag("json"),
        })
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            render::print_json(value)
        } else {
            println!("{}", text(value));
            Ok(())
        }
    }

    fn done(&self, message: &str) -> Result<()> {
        if self.json {
            render::print_json(&serde_json::json!({ "success": true, "message": message }))
        } else {
            println!("{message}");
            Ok(())
        }
    }
}

/// Dispatch the parsed subcommand.
pub async fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let ctx = CliContext::from_matches(matches)?;
    let Some((name, sub)) = matches.subcommand() else {
        bail!("No command given, see --help");
    };

    match name {
        "login" => login(&ctx, sub).await?,
        "register" => register(&ctx, sub).await?,
        "logout" => {
            ctx.client.auth().logout()?;
            ctx.done("Logged out")?;
        }
        "whoami" => whoami(&ctx).await?,
        "oauth-url" => {
            let url = ctx.client.auth().google_auth_url();
            ctx.emit(&serde_json::json!({ "url": url }), |_| url.clone())?;
        }
        "profile" => profile(&ctx, sub).await?,
        "password" => password(&ctx, sub).await?,
        "scan" => return scan(&ctx, sub).await,
        "history" => {
            let page = ctx
                .client
                .scans()
                .list(page_arg(sub, "page"), page_arg(sub, "limit"))
                .await?;
            ctx.emit(&page, render::history)?;
        }
        "show" => show(&ctx, sub).await?,
        "delete" => {
            let id = required(sub, "id")?;
            ctx.client.scans().delete(id).await?;
            ctx.done(&format!("Scan {id} deleted"))?;
        }
        "correct" => {
            let correction = ctx
                .client
                .corrections()
                .submit(
                    required(sub, "id")?,
                    required(sub, "field")?,
                    required(sub, "value")?,
                )
                .await?;
            ctx.emit(&correction, |c| {
                format!("Correction submitted\n{}", render::corrections(std::slice::from_ref(c)))
            })?;
        }
        "corrections" => {
            let list = ctx.client.corrections().list(required(sub, "id")?).await?;
            ctx.emit(&list, |list| render::corrections(list))?;
        }
        "product" => product(&ctx, sub).await?,
        "compare" => compare(&ctx, sub).await?,
        "admin" => admin(&ctx, sub).await?,
        other => bail!("Unknown command '{other}'"),
    }
    Ok(ExitCode::SUCCESS)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument <{name}>"))
}

fn page_arg(matches: &ArgMatches, name: &str) -> u32 {
    matches.get_one::<u32>(name).copied().unwrap_or(1)
}

/// Use the flag value, else prompt and read one line from stdin.
fn secret(matches: &ArgMatches, name: &str, prompt: &str) -> Result<String> {
    if let Some(value) = matches.get_one::<String>(name) {
        return Ok(value.clone());
    }
    eprint!("{prompt}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let email = required(sub, "email")?;
    let password = secret(sub, "password", "Password")?;
    let user = ctx.client.auth().login(email, &password).await?;
    ctx.emit(&user, |u| format!("Welcome back!\n{}", render::user(u)))
}

async fn register(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let password = secret(sub, "password", "Password")?;
    let user = ctx
        .client
        .auth()
        .register(required(sub, "name")?, required(sub, "email")?, &password)
        .await?;
    ctx.emit(&user, |u| format!("Account created successfully!\n{}", render::user(u)))
}

async fn whoami(ctx: &CliContext) -> Result<()> {
    if !ctx.client.session().is_authenticated() {
        bail!("Not logged in");
    }
    let user = ctx.client.users().profile().await?;
    if let Err(err) = ctx.client.session().set_user(user.clone()) {
        log::warn!("Could not update stored user: {err:#}");
    }
    ctx.emit(&user, render::user)
}

async fn profile(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let request = UpdateProfileRequest {
        name: sub.get_one::<String>("name").cloned(),
        avatar_url: sub.get_one::<String>("avatar-url").cloned(),
    };
    let user = if request.name.is_none() && request.avatar_url.is_none() {
        ctx.client.users().profile().await?
    } else {
        let user = ctx.client.users().update_profile(&request).await?;
        if !ctx.json {
            println!("Profile updated!");
        }
        user
    };
    ctx.emit(&user, render::user)
}

async fn password(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let current = secret(sub, "current", "Current password")?;
    let new = secret(sub, "new", "New password")?;
    let confirm = secret(sub, "confirm", "Confirm new password")?;
    ctx.client
        .users()
        .change_password(&current, &new, &confirm)
        .await?;
    ctx.done("Password changed!")
}

async fn scan(ctx: &CliContext, sub: &ArgMatches) -> Result<ExitCode> {
    let path = sub
        .get_one::<PathBuf>("image")
        .ok_or_else(|| anyhow!("Please upload nutrition label image"))?;
    let barcode = sub.get_one::<String>("barcode").cloned();
    let store_image = ctx.config.upload.store_image && !sub.get_flag("no-store");

    if sub.get_flag("no-wait") {
        let submitter = ScanSubmitter::new(ctx.client.clone(), ctx.config.upload_policy());
        let scan = submitter.submit_file(path, barcode, store_image).await?;
        ctx.emit(&scan, render::scan_line)?;
        return Ok(ExitCode::SUCCESS);
    }

    let workflow = ScanWorkflow::new(
        ctx.client.clone(),
        ctx.config.upload_policy(),
        ctx.config.poll_config(),
    );
    let handle = workflow.start_file(path, barcode, store_image).await?;

    let canceller = handle.canceller();
    cleanup::register_cleanup(move || {
        let _ = canceller.send(PollControl::Cancel);
    });

    if !ctx.json {
        eprintln!("Analyzing label...");
        let events = handle.events().clone();
        spawn_task("poll-progress", async move {
            while let Ok(event) = events.recv_async().await {
                if let PollEvent::Snapshot { attempt, scan } = event {
                    log::debug!("Check {attempt}: {}", scan.status);
                    eprint!(".");
                }
            }
            eprintln!();
        });
    }

    let outcome = handle.wait().await?;
    cleanup::clear_cleanups();

    if ctx.json {
        render::print_json(&serde_json::json!({
            "outcome": outcome.label(),
            "message": outcome.message(),
            "scan": outcome.scan(),
        }))?;
    } else {
        println!("{}", render::outcome(&outcome));
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn show(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    let scan = ctx.client.scans().get(id).await?;
    if sub.get_flag("image-url") {
        let url = ctx.client.scans().image_url(id).await?;
        return ctx.emit(&serde_json::json!({ "scan": scan, "image_url": url }), |_| {
            format!("{}\n  Image:    {url}", render::scan_detail(&scan))
        });
    }
    ctx.emit(&scan, render::scan_detail)
}

async fn product(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let external = ExternalDecoder::new(ctx.config.barcode.program.clone());
    if sub.contains_id("image") || sub.contains_id("frames") {
        let version = external.probe()?;
        log::debug!("Using {} {version}", external.program());
    }
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(external);

    let barcode = if let Some(image) = sub.get_one::<PathBuf>("image") {
        let code = decode_still(decoder, image.clone()).await?;
        if !ctx.json {
            println!("Barcode detected: {code}");
        }
        code
    } else if let Some(dir) = sub.get_one::<PathBuf>("frames") {
        let code = decode_frames(
            decoder,
            dir,
            Duration::from_millis(ctx.config.barcode.frame_interval_ms),
        )
        .await?;
        if !ctx.json {
            println!("Barcode detected: {code}");
        }
        code
    } else {
        sub.get_one::<String>("barcode").cloned().unwrap_or_default()
    };

    let product = ctx.client.products().by_barcode(&barcode).await?;
    ctx.emit(&product, render::product)
}

async fn decode_still(decoder: Arc<dyn BarcodeDecoder>, image: PathBuf) -> Result<String> {
    let code = spawn_blocking_task("barcode-decode", move || {
        decode_file(decoder.as_ref(), &image, &default_ladder())
    })
    .await
    .context("Barcode decoding task failed")??;
    Ok(code)
}

async fn decode_frames(
    decoder: Arc<dyn BarcodeDecoder>,
    dir: &Path,
    frame_interval: Duration,
) -> Result<String> {
    let source = DirectoryFrameSource::open(dir)?;
    let handle = StreamHandle::spawn(
        Box::new(source),
        decoder,
        DecodeConfig::default(),
        frame_interval,
    );

    let stopper = handle.stopper();
    cleanup::register_cleanup(move || {
        let _ = stopper.send(StreamControl::Stop);
    });
    let outcome = handle.wait().await?;
    cleanup::clear_cleanups();

    match outcome? {
        StreamOutcome::Detected(code) => Ok(code),
        StreamOutcome::Stopped => bail!("Barcode scan stopped"),
        StreamOutcome::Exhausted => bail!(NOT_FOUND_MESSAGE),
    }
}

async fn compare(ctx: &CliContext, sub: &ArgMatches) -> Result<()> {
    let scans = ctx.client.scans();
    let a = scans.get(required(sub, "id")?).await?;
    let b = scans.get(required(sub, "other")?).await?;

    let mut selection = CompareSelection::new();
    selection.select_a(a)?;
    selection.select_b(b)?;
    let request = selection.request()?;

    let result = ctx.client.compare().compare(&request).await?;
    ctx.emit(&result, render::comparison)
}

async fn admin(ctx: &CliContext, matches: &ArgMatches) -> Result<()> {
    let admin = ctx.client.admin();
    match matches.subcommand() {
        Some(("stats", _)) => ctx.emit(&admin.stats().await?, render::admin_stats),
        Some(("users", sub)) => {
            let page = admin
                .users(page_arg(sub, "page"), page_arg(sub, "limit"))
                .await?;
            ctx.emit(&page, render::admin_users)
        }
        Some(("user", sub)) => ctx.emit(&admin.user(required(sub, "id")?).await?, render::admin_user),
        Some(("role", sub)) => {
            let role = Role::from_str(required(sub, "role")?)
                .map_err(|_| anyhow!("Role must be 'user' or 'admin'"))?;
            let user = admin.update_role(required(sub, "id")?, role).await?;
            ctx.emit(&user, render::admin_user)
        }
        Some(("delete", sub)) => {
            let id = required(sub, "id")?;
            admin.delete_user(id).await?;
            ctx.done(&format!("User {id} deleted"))
        }
        _ => bail!("Unknown admin command, see `nutriscan admin --help`"),
    }
}
