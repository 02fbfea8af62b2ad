use anyhow::Result;

use crate::cli::{Cli, CompareArgs};
use crate::compare::{Comparator, OwnershipMatcher};
use crate::config::TypeWeights;
use crate::io::write_comparison;

use super::{load_config, read_sanitized};

pub fn run(cli: &Cli, args: &CompareArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    let comparison = &mut config.comparison;
    if let Some(tolerance) = args.area_tolerance { comparison.area_tolerance = tolerance }
    if !args.weights.is_empty() {
        comparison.type_weights = args.weights.iter().cloned().collect::<TypeWeights>();
    }
    if args.any_owner {
        comparison.ownership = OwnershipMatcher::any();
    } else if !args.owners.is_empty() {
        comparison.ownership = OwnershipMatcher::new(args.owners.iter().cloned());
    }

    let mut prior = read_sanitized(&args.prior, &args.crs, &config)?;
    let current = read_sanitized(&args.current, &args.crs, &config)?;

    if let Some(field) = &args.owned_area_field {
        prior.assign_ownership_percentage(field, &config.fields, &config.comparison.ownership);
    }

    let comparator = Comparator::new(&current, &config.comparison, &config.fields)?;
    let result = comparator.compare(&prior)?;
    write_comparison(&result, &args.output, args.force)?;

    let (prior_area, retained_area, lost_area) = result.area_totals();
    let (prior_score, retained_score, lost_score) = result.score_totals();
    println!(
        "Compared {} prior features: area {prior_area:.1}, retained {retained_area:.1}, lost {lost_area:.1}; \
         score {prior_score:.1}, retained {retained_score:.1}, lost {lost_score:.1} -> {}",
        result.len(),
        args.output.display(),
    );
    Ok(())
}
