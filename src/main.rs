//! CLI for the CU Study Hub intake pipeline.
//!
//! Compacts a PDF, stores the artifact under a local data directory, and
//! records the note metadata in a JSON note store — the same pipeline the
//! hosted service runs, against filesystem collaborators.

use std::sync::Arc;
use std::{env, process};
use studyhub_intake::{
    format_size, Category, CompactionStage, FileBlob, FsBlobStore, IntakeController,
    JsonNoteStore, NoteFilter, NoteStore, PdfCompactor, Result,
};
use tracing_subscriber::EnvFilter;

struct Args {
    pdf_path: Option<String>,
    data_dir: String,
    list: bool,
    name: String,
    roll: String,
    course: String,
    branch: String,
    subject: String,
    semester: String,
    category: Category,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let argv: Vec<String> = env::args().collect();
    if argv.contains(&"--help".to_string()) || argv.contains(&"-h".to_string()) {
        print_usage(&argv[0]);
        process::exit(0);
    }

    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("❌ {msg}");
            print_usage(&argv[0]);
            process::exit(1);
        }
    };

    let outcome = if args.list {
        list_notes(&args).await
    } else {
        run_intake(&args).await
    };

    if let Err(e) = outcome {
        eprintln!("\n❌ Error: {e}");
        process::exit(1);
    }
}

fn print_usage(program_name: &str) {
    println!("📄 studyhub-intake - compact a PDF and file it into the note store");
    println!();
    println!("USAGE:");
    println!("    {program_name} <pdf_file> --subject <s> --semester <n> [options]");
    println!("    {program_name} --list [--data-dir <dir>]");
    println!();
    println!("OPTIONS:");
    println!("    --subject <s>     Subject the note covers (required)");
    println!("    --semester <n>    Semester the note targets (required)");
    println!("    --name <n>        Uploader name          (default: Anonymous)");
    println!("    --roll <n>        Uploader roll number   (default: 0)");
    println!("    --course <c>      Course                 (default: BCA)");
    println!("    --branch <b>      Branch                 (default: General)");
    println!("    --category <c>    Basic|Simple|Advanced|Reference (default: Basic)");
    println!("    --data-dir <dir>  Data directory         (default: ./studyhub-data)");
    println!("    --list            List stored notes instead of uploading");
    println!("    -h, --help        Show this help message");
}

fn parse_args(argv: &[String]) -> std::result::Result<Args, String> {
    let mut args = Args {
        pdf_path: None,
        data_dir: "./studyhub-data".into(),
        list: false,
        name: "Anonymous".into(),
        roll: "0".into(),
        course: "BCA".into(),
        branch: "General".into(),
        subject: String::new(),
        semester: String::new(),
        category: Category::Basic,
    };

    let mut i = 1;
    while i < argv.len() {
        let arg = &argv[i];
        let take_value = |i: &mut usize| -> std::result::Result<String, String> {
            *i += 1;
            argv.get(*i)
                .cloned()
                .ok_or_else(|| format!("{arg} expects a value"))
        };
        match arg.as_str() {
            "--list" => args.list = true,
            "--data-dir" => args.data_dir = take_value(&mut i)?,
            "--name" => args.name = take_value(&mut i)?,
            "--roll" => args.roll = take_value(&mut i)?,
            "--course" => args.course = take_value(&mut i)?,
            "--branch" => args.branch = take_value(&mut i)?,
            "--subject" => args.subject = take_value(&mut i)?,
            "--semester" => args.semester = take_value(&mut i)?,
            "--category" => {
                let raw = take_value(&mut i)?;
                args.category = Category::parse(&raw)
                    .ok_or_else(|| format!("unknown category '{raw}'"))?;
            }
            other if other.starts_with("--") => return Err(format!("unknown option {other}")),
            other => {
                if args.pdf_path.is_some() {
                    return Err("more than one input file given".into());
                }
                args.pdf_path = Some(other.to_string());
            }
        }
        i += 1;
    }

    if !args.list {
        if args.pdf_path.is_none() {
            return Err("no input PDF given".into());
        }
        if args.subject.is_empty() || args.semester.is_empty() {
            return Err("--subject and --semester are required".into());
        }
    }
    Ok(args)
}

async fn open_stores(args: &Args) -> Result<(Arc<FsBlobStore>, Arc<JsonNoteStore>)> {
    let blobs = FsBlobStore::new(format!("{}/blobs", args.data_dir)).await?;
    let notes = JsonNoteStore::open(format!("{}/notes.json", args.data_dir)).await?;
    Ok((Arc::new(blobs), Arc::new(notes)))
}

async fn list_notes(args: &Args) -> Result<()> {
    let (_, notes) = open_stores(args).await?;
    let records = notes.query(&NoteFilter::default()).await?;

    if records.is_empty() {
        println!("ℹ️  No notes stored under {}", args.data_dir);
        return Ok(());
    }

    println!("📚 {} note(s) in {}:", records.len(), args.data_dir);
    println!("{}", "─".repeat(60));
    for record in records {
        let flag = if record.published { "published" } else { "draft" };
        println!(
            "  {} — {} (sem {}, {}) [{flag}]",
            record.file_name, record.metadata.subject, record.metadata.semester,
            record.metadata.category
        );
        println!(
            "      {} -> {} ({}%), uploaded {} by {}",
            format_size(record.original_size),
            format_size(record.compacted_size),
            record.compression_ratio,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.metadata.uploader_name
        );
    }
    Ok(())
}

async fn run_intake(args: &Args) -> Result<()> {
    let pdf_path = args.pdf_path.as_deref().expect("checked in parse_args");
    println!("🔍 Reading PDF: {pdf_path}");
    let bytes = tokio::fs::read(pdf_path).await?;
    let original_size = bytes.len() as u64;

    let (blobs, notes) = open_stores(args).await?;
    let compactor = PdfCompactor::new().on_stage(|stage: CompactionStage| {
        println!("   … {stage}");
    });
    let controller = IntakeController::with_compactor(compactor, blobs, notes);

    println!("🗜️  Compacting…");
    controller
        .select_file(FileBlob::new(
            file_name_of(pdf_path),
            bytes,
            "application/pdf",
        ))
        .await?;

    let draft = controller.draft().await;
    match draft.compression_ratio {
        Some(ratio) => println!(
            "✅ Compacted: {} -> {} (saved {ratio}%)",
            format_size(original_size),
            format_size(draft.compacted_file.as_ref().map(|b| b.len() as u64).unwrap_or(0)),
        ),
        None => println!("⚠️  Compression did not apply; uploading the original file"),
    }

    controller
        .update_metadata(|m| {
            m.uploader_name = args.name.clone();
            m.roll_number = args.roll.clone();
            m.course = args.course.clone();
            m.branch = args.branch.clone();
            m.subject = args.subject.clone();
            m.semester = args.semester.clone();
            m.category = args.category;
        })
        .await;

    println!("📤 Storing…");
    let record = controller.submit().await?;

    println!("\n{}", "─".repeat(60));
    println!("🎉 Notes uploaded successfully!");
    println!("   • Record id : {}", record.id);
    println!("   • File      : {}", record.file_name);
    println!("   • Stored at : {}", record.file_url);
    println!(
        "   • Size      : {} -> {} ({}%)",
        format_size(record.original_size),
        format_size(record.compacted_size),
        record.compression_ratio
    );
    Ok(())
}

fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}
