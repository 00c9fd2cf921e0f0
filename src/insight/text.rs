use crate::insight::classify::{Classifications, DecayLevel, IvClass, IvLevel, Moneyness};
use crate::insight::InsightContext;

/// Number of sentences in every insight.
pub const SENTENCE_COUNT: usize = 4;

/// Four sentences, always in this order: volatility, theta, moneyness/breakeven, odds.
pub fn generate_insight(ctx: &InsightContext, classes: &Classifications) -> String {
    let sentences: [String; SENTENCE_COUNT] = [
        volatility_sentence(&classes.iv),
        theta_sentence(ctx.theta, ctx.premium, classes.theta.level),
        moneyness_sentence(ctx, classes.moneyness.bucket),
        probability_sentence(ctx.probability_of_profit),
    ];
    sentences.join(" ")
}

fn volatility_sentence(iv: &IvClass) -> String {
    let detail = &iv.detail;
    match iv.level {
        IvLevel::ExtremelyExpensive => {
            format!("Options are very pricey and traders expect big swings ({detail}).")
        }
        IvLevel::Expensive => {
            format!("Options cost more than usual as the market sees above-normal risk ({detail}).")
        }
        IvLevel::Fair => format!("Option pricing looks normal compared to past volatility ({detail})."),
        IvLevel::Cheap => {
            format!("Options are cheaper than usual with the market calm versus history ({detail}).")
        }
        IvLevel::Depressed => {
            format!("Options are very cheap and the market sees little chance of big moves ({detail}).")
        }
        IvLevel::VeryHigh => format!("Implied volatility is near the top of its range ({detail})."),
        IvLevel::High => format!("Implied volatility is running above its usual range ({detail})."),
        IvLevel::Normal => format!("Implied volatility sits inside its usual range ({detail})."),
        IvLevel::Low => format!("Implied volatility is running below its usual range ({detail})."),
        IvLevel::VeryLow => format!("Implied volatility is near the bottom of its range ({detail})."),
    }
}

fn theta_sentence(theta: f64, premium: f64, level: DecayLevel) -> String {
    let decay = theta.abs();
    match level {
        DecayLevel::Severe => {
            let pct = if premium > 0.0 { decay / premium * 100.0 } else { 0.0 };
            format!("This option loses a lot of value every day, about ${decay:.2} ({pct:.1}% of the premium).")
        }
        DecayLevel::High => format!("Value drops quickly, around ${decay:.2} each day."),
        DecayLevel::Moderate => format!("There is some daily decay of about ${decay:.2} each day."),
        DecayLevel::Low => format!("Time decay is light at only about ${decay:.2} per day."),
    }
}

fn moneyness_sentence(ctx: &InsightContext, bucket: Moneyness) -> String {
    let near_atm = if bucket == Moneyness::Atm {
        ", and since it sits right at the stock price small moves matter a lot"
    } else {
        ""
    };
    format!(
        "This {} is {} and needs the stock at ${:.2} by expiry to break even{}.",
        ctx.option_type, bucket, ctx.breakeven, near_atm
    )
}

fn probability_sentence(pop: f64) -> String {
    let pct = pop * 100.0;
    if pop >= 0.70 {
        format!("Strong odds with about a {pct:.0}% chance of profit.")
    } else if pop >= 0.55 {
        format!("Better than average odds with a {pct:.0}% chance of profit.")
    } else if pop >= 0.40 {
        format!("Fair odds with about a {pct:.0}% chance of profit.")
    } else if pop >= 0.25 {
        format!("Low chance of profit at only {pct:.0}%.")
    } else {
        format!("Very low odds with about a {pct:.0}% chance of profit.")
    }
}
