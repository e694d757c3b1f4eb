use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::{CompanyKey, ContactId};
use storage::{NewContact, Storage, CONTACT_LIST_CAP};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/contacts.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a company or renames an existing one.
    AddCompany { rut: String, name: String },
    AddContact {
        name: String,
        email: String,
        #[arg(long)]
        company: Option<String>,
        /// Keep an existing identifier instead of generating one.
        #[arg(long)]
        id: Option<String>,
    },
    List,
    /// Clears the sent flag of one contact, or of all with `--all`.
    ResetSent {
        contact_id: Option<String>,
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::AddCompany { rut, name } => {
            let key = CompanyKey(rut);
            storage.upsert_company(&key, &name).await?;
            println!("saved company {key}");
        }
        Command::AddContact {
            name,
            email,
            company,
            id,
        } => {
            let company = company.map(CompanyKey);
            let contact = NewContact {
                name: &name,
                email: &email,
                company: company.as_ref(),
            };
            let contact_id = match id {
                Some(id) => {
                    let contact_id = ContactId(id);
                    storage.insert_contact_with_id(&contact_id, contact).await?;
                    contact_id
                }
                None => storage.create_contact(contact).await?,
            };
            println!("created contact_id={contact_id}");
        }
        Command::List => {
            for contact in storage.list_contacts(CONTACT_LIST_CAP).await? {
                let company = match &contact.company {
                    Some(key) => storage
                        .company_by_key(key)
                        .await?
                        .map(|c| c.name)
                        .unwrap_or_else(|| format!("<unknown {key}>")),
                    None => "-".to_string(),
                };
                let sent = match contact.intro_sent_at {
                    Some(at) => format!("sent {}", at.format("%Y-%m-%d")),
                    None if contact.intro_sent => "sent".to_string(),
                    None => "pending".to_string(),
                };
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    contact.id, contact.name, contact.email, company, sent
                );
            }
        }
        Command::ResetSent { contact_id, all } => {
            let contact_id = match (contact_id, all) {
                (Some(id), false) => Some(ContactId(id)),
                (None, true) => None,
                _ => bail!("pass either a contact id or --all"),
            };
            let reset = storage.reset_intro_sent(contact_id.as_ref()).await?;
            println!("reset {reset} contact(s)");
        }
    }

    Ok(())
}
