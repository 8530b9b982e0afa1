//! Seed list for `populate-companies`.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::companies::store::{find_by_name, insert_company, CompanyFields};

pub struct SeedCompany {
    pub name: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub location: &'static str,
}

pub const SEED_COMPANIES: &[SeedCompany] = &[
    SeedCompany {
        name: "Google",
        description: "A multinational technology company specializing in Internet-related services and products.",
        website: "https://www.google.com",
        location: "Mountain View, CA",
    },
    SeedCompany {
        name: "Microsoft",
        description: "A multinational technology corporation producing computer software, consumer electronics, and personal computers.",
        website: "https://www.microsoft.com",
        location: "Redmond, WA",
    },
    SeedCompany {
        name: "Apple",
        description: "A multinational technology company that designs, develops, and sells consumer electronics, software, and services.",
        website: "https://www.apple.com",
        location: "Cupertino, CA",
    },
    SeedCompany {
        name: "Amazon",
        description: "A multinational technology company focusing on e-commerce, cloud computing, digital streaming, and artificial intelligence.",
        website: "https://www.amazon.com",
        location: "Seattle, WA",
    },
    SeedCompany {
        name: "Meta",
        description: "A technology company focused on social networking, virtual reality, and metaverse technologies.",
        website: "https://www.meta.com",
        location: "Menlo Park, CA",
    },
    SeedCompany {
        name: "Netflix",
        description: "A streaming technology company providing subscription-based video on demand services.",
        website: "https://www.netflix.com",
        location: "Los Gatos, CA",
    },
    SeedCompany {
        name: "Twitter",
        description: "A social networking platform that enables users to send and receive short posts.",
        website: "https://www.twitter.com",
        location: "San Francisco, CA",
    },
    SeedCompany {
        name: "LinkedIn",
        description: "A professional networking platform and job marketplace.",
        website: "https://www.linkedin.com",
        location: "Sunnyvale, CA",
    },
    SeedCompany {
        name: "Salesforce",
        description: "A cloud-based software company specializing in customer relationship management.",
        website: "https://www.salesforce.com",
        location: "San Francisco, CA",
    },
    SeedCompany {
        name: "Adobe",
        description: "A software company focused on creative software products and digital experiences.",
        website: "https://www.adobe.com",
        location: "San Jose, CA",
    },
    // Major banks
    SeedCompany {
        name: "JPMorgan Chase",
        description: "A multinational investment bank and financial services company.",
        website: "https://www.jpmorganchase.com",
        location: "New York, NY",
    },
    SeedCompany {
        name: "Goldman Sachs",
        description: "A leading global investment banking, securities and investment management firm.",
        website: "https://www.goldmansachs.com",
        location: "New York, NY",
    },
    SeedCompany {
        name: "Morgan Stanley",
        description: "A multinational investment bank and financial services company.",
        website: "https://www.morganstanley.com",
        location: "New York, NY",
    },
    SeedCompany {
        name: "Bank of America",
        description: "A multinational investment bank and financial services company.",
        website: "https://www.bankofamerica.com",
        location: "Charlotte, NC",
    },
    SeedCompany {
        name: "Citigroup",
        description: "A multinational investment bank and financial services corporation.",
        website: "https://www.citigroup.com",
        location: "New York, NY",
    },
    SeedCompany {
        name: "Wells Fargo",
        description: "A multinational financial services company.",
        website: "https://www.wellsfargo.com",
        location: "San Francisco, CA",
    },
    SeedCompany {
        name: "Barclays",
        description: "A British multinational universal bank and financial services company.",
        website: "https://www.barclays.com",
        location: "London, UK",
    },
];

/// Inserts every seed company that does not exist yet. Returns how many were created.
pub async fn populate_companies(pool: &PgPool) -> Result<usize> {
    let mut created = 0;
    for seed in SEED_COMPANIES {
        if find_by_name(pool, seed.name).await?.is_some() {
            info!("Company {} already present", seed.name);
            continue;
        }
        insert_company(
            pool,
            &CompanyFields {
                name: seed.name.to_string(),
                description: seed.description.to_string(),
                website: seed.website.to_string(),
                location: seed.location.to_string(),
                ..Default::default()
            },
        )
        .await?;
        created += 1;
        info!("Added company {}", seed.name);
    }
    Ok(created)
}
