use crate::infra::{
    InMemoryDocumentStore, InMemoryFilingRepository, SeededDirectory, SharedSecretVerifier,
};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

use filing_desk::error::AppError;
use filing_desk::workflows::filing::{
    ActorRole, AmendmentDetails, AmendmentRegistry, AmendmentType, BusinessId, DocumentKind,
    FilingStatus, FilingSubmission, FilingType, FilingWorkflowService, RejectionCatalog,
    VehicleId,
};

const DEMO_TOKEN: &str = "demo-agent-token";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the Schedule 1 issuance step at the end of the walkthrough
    #[arg(long)]
    pub(crate) skip_issuance: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct GuideArgs {
    /// Limit the guide to one amendment type
    #[arg(long, value_parser = parse_amendment_type)]
    pub(crate) amendment_type: Option<AmendmentType>,
}

fn parse_amendment_type(raw: &str) -> Result<AmendmentType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "vin_correction" => Ok(AmendmentType::VinCorrection),
        "weight_increase" => Ok(AmendmentType::WeightIncrease),
        "mileage_exceeded" => Ok(AmendmentType::MileageExceeded),
        other => Err(format!(
            "'{other}' is not one of vin_correction, weight_increase, mileage_exceeded"
        )),
    }
}

fn sample_details(amendment_type: AmendmentType) -> AmendmentDetails {
    match amendment_type {
        AmendmentType::VinCorrection => AmendmentDetails::VinCorrection {
            original_vin: "1XKWDB0X57J211825".to_string(),
            corrected_vin: "1XKWDB0X57J211826".to_string(),
            vehicle_id: None,
        },
        AmendmentType::WeightIncrease => AmendmentDetails::WeightIncrease {
            original_category: "K".to_string(),
            new_category: "M".to_string(),
            increase_month: "2025-11".to_string(),
            additional_tax_due: Decimal::new(12500, 2),
        },
        AmendmentType::MileageExceeded => AmendmentDetails::MileageExceeded {
            mileage_limit: 5_000,
            actual_mileage: 6_120,
            agricultural: false,
            exceeded_month: "2025-10".to_string(),
        },
    }
}

/// Print the per-type processing walkthroughs plus the rejection catalog, the
/// same reference material agents see in the workstation.
pub(crate) fn run_amendment_guide(args: GuideArgs) -> Result<(), AppError> {
    let registry = AmendmentRegistry::standard();
    let types = match args.amendment_type {
        Some(single) => vec![single],
        None => AmendmentType::ordered().to_vec(),
    };

    for amendment_type in types {
        let instructions = registry.derive(&sample_details(amendment_type));
        println!("== {} ==", instructions.title);
        println!("{}", instructions.description);
        for (index, step) in instructions.steps.iter().enumerate() {
            println!("  {}. {step}", index + 1);
        }
        for note in &instructions.important_notes {
            println!("  note: {note}");
        }
        if let Some(tax) = &instructions.tax_info {
            match (&tax.additional_tax_due, tax.is_free) {
                (_, true) => println!("  tax: none due"),
                (Some(amount), _) => println!("  tax: ${amount} additional due"),
                (None, _) => println!("  tax: computed per weight category"),
            }
        }
        println!();
    }

    println!("== Rejection catalog ==");
    let catalog = RejectionCatalog::standard();
    for reason in catalog.reasons() {
        let action = catalog
            .required_action(reason.default_action)
            .map(|action| action.label)
            .unwrap_or("unknown");
        println!("  {:<20} {:<14} -> {}", reason.id, reason.code, action);
    }

    Ok(())
}

/// Walk one filing through the whole back-office lifecycle with in-memory
/// infrastructure, printing each state as it commits.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = FilingWorkflowService::new(
        Arc::new(InMemoryFilingRepository::default()),
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(SharedSecretVerifier::with_token(DEMO_TOKEN)),
        Arc::new(SeededDirectory::standard()),
    );

    let submission = FilingSubmission {
        filing_type: FilingType::Amendment,
        business_id: Some(BusinessId("biz-001".to_string())),
        vehicle_ids: vec![VehicleId("veh-001".to_string())],
        amendment_type: Some(AmendmentType::WeightIncrease),
        amendment_details: Some(sample_details(AmendmentType::WeightIncrease)),
        amendment_due_date: None,
        input_documents: vec!["mem://inputs/cab-card.pdf".to_string()],
        mcs150: None,
    };

    let filing = service.submit(submission)?;
    println!(
        "submitted {} ({})",
        filing.id,
        service.amendment_registry().summarize(&filing)
    );

    let filing = service.transition_status(
        &filing.id,
        ActorRole::Agent,
        FilingStatus::Processing,
        None,
    )?;
    println!("agent picked up the filing: {:?}", filing.status);

    let filing = service.transition_status(
        &filing.id,
        ActorRole::Agent,
        FilingStatus::ActionRequired,
        Some("doc_illegible"),
    )?;
    println!(
        "agent rejected: code={} action={}",
        filing.rejection_code.as_deref().unwrap_or("-"),
        filing.required_action.as_deref().unwrap_or("-"),
    );

    let filing = service.record_customer_response(
        &filing.id,
        Some("Re-uploaded a clean scan of the cab card.".to_string()),
        Some("mem://inputs/cab-card-rescan.pdf".to_string()),
    )?;
    println!(
        "customer responded at {}",
        filing
            .customer_response
            .as_ref()
            .map(|response| response.submitted_at.to_rfc3339())
            .unwrap_or_default()
    );

    let filing = service.save_agent_notes(
        &filing.id,
        "Rescan verified; resubmitting to the IRS.".to_string(),
        None,
    )?;
    println!("agent notes saved: {:?}", filing.agent_notes);

    if args.skip_issuance {
        println!("skipping issuance; filing left in {:?}", filing.status);
        return Ok(());
    }

    let filing = service.attach_document(
        &filing.id,
        DocumentKind::FinalSchedule1,
        &mime::APPLICATION_PDF,
        b"%PDF-1.7 stamped schedule 1".to_vec(),
        DEMO_TOKEN,
    )?;
    println!(
        "schedule 1 issued at {} -> {:?}",
        filing.final_schedule1_url.as_deref().unwrap_or("-"),
        filing.status,
    );

    Ok(())
}
