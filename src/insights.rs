use std::fmt::Write;

use tracing::debug;

use crate::models::{SleepRecord, SleepSummary};
use crate::stats::{self, LOW_DAY_HOURS, OVERSLEPT_HOURS, UNDERSLEPT_HOURS};

pub const NO_DATA: &str = "No sleep data available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Duration,
    Timing,
}

pub struct InsightRule {
    pub name: &'static str,
    pub section: Section,
    pub applies: fn(&SleepSummary) -> bool,
    pub render: fn(&SleepSummary) -> String,
}

/// Evaluated top to bottom; every matching rule contributes one line.
pub static RULES: &[InsightRule] = &[
    InsightRule {
        name: "critically_low",
        section: Section::Duration,
        applies: |s| s.average < 6.0,
        render: |s| {
            format!(
                "Your average of {:.1} hours is critically low. Sustained sleep under 6 hours \
                 impairs focus, mood and immunity, so getting to bed earlier comes first.",
                s.average
            )
        },
    },
    InsightRule {
        name: "slightly_below",
        section: Section::Duration,
        applies: |s| (6.0..7.0).contains(&s.average),
        render: |s| {
            format!(
                "Your average of {:.1} hours is slightly below the recommended 7-9 hours. \
                 Another 30-60 minutes a night would close the gap.",
                s.average
            )
        },
    },
    InsightRule {
        name: "optimal",
        section: Section::Duration,
        applies: |s| (7.0..=9.0).contains(&s.average),
        render: |s| {
            format!(
                "Your average of {:.1} hours is within the optimal 7-9 hour range. \
                 Keep protecting this routine.",
                s.average
            )
        },
    },
    InsightRule {
        name: "oversleeping",
        section: Section::Duration,
        applies: |s| s.average > 9.0,
        render: |s| {
            format!(
                "Your average of {:.1} hours is above 9 hours. Regular oversleeping can point \
                 to fatigue, low mood or an underlying condition.",
                s.average
            )
        },
    },
    InsightRule {
        name: "fluctuation",
        section: Section::Duration,
        applies: |s| s.variation > 3.0,
        render: |s| {
            format!(
                "Your sleep swung by {:.1} hours between the shortest and longest night. \
                 Irregular durations unsettle your body clock; aim for similar nights.",
                s.variation
            )
        },
    },
    InsightRule {
        name: "very_short_night",
        section: Section::Duration,
        applies: |s| s.has_low_days,
        render: |s| {
            format!(
                "Red flag: at least one night was under {LOW_DAY_HOURS:.0} hours \
                 ({:.1} hours on {}). Nights this short sharply reduce next-day alertness.",
                s.worst.hours, s.worst.date
            )
        },
    },
    InsightRule {
        name: "oversleeping_pattern",
        section: Section::Duration,
        applies: |s| s.overslept_nights >= 2,
        render: |s| {
            format!(
                "{} nights ran longer than {OVERSLEPT_HOURS:.0} hours. A repeated oversleeping \
                 pattern is worth raising with a doctor.",
                s.overslept_nights
            )
        },
    },
    InsightRule {
        name: "chronic_deprivation",
        section: Section::Duration,
        applies: |s| s.underslept_nights >= 3,
        render: |s| {
            format!(
                "{} nights were under {UNDERSLEPT_HOURS:.0} hours, a sign of chronic sleep \
                 deprivation.",
                s.underslept_nights
            )
        },
    },
    InsightRule {
        name: "sleeping_late",
        section: Section::Timing,
        applies: |s| s.onset_average.is_some_and(|onset| stats::clock_hour(onset) >= 1),
        render: |_| "You’re sleeping too late. Try to sleep before 11:00 PM.".to_string(),
    },
    InsightRule {
        name: "waking_late",
        section: Section::Timing,
        applies: |s| s.wake_average.is_some_and(|wake| stats::clock_hour(wake) >= 9),
        render: |_| {
            "Waking up late may reduce productivity. Try waking up earlier.".to_string()
        },
    },
];

const RECOMMENDATIONS: &str = "\
**AI Recommendations**
- Target 7–9 hours of sleep consistently to restore body and brain functions.
- Sleep before 11:00 PM to align with melatonin release and circadian rhythm.
- Reduce exposure to blue light 1–2 hours before bedtime (phones, laptops).
- Avoid heavy meals, caffeine, and stimulating activities 2 hours before sleep.
- Use relaxation techniques like deep breathing, journaling, or light stretching.

**Root Cause Suggestions**
- Sleep < 4 hours regularly can lead to low energy, poor focus, mood swings, and long-term health decline.
- Sleeping after 1:00 AM disturbs melatonin cycles, leading to shallow and disrupted sleep.
- Poor sleep quality may be linked to stress, poor environment, anxiety, or inconsistent routines.

**Daily Lifestyle Practices for Better Sleep**
- Get morning sunlight for 15–30 mins daily — it helps regulate your sleep-wake clock.
- Include light physical activity like walking, yoga, or stretches — ideally before 7 PM.
- Stay hydrated, but reduce water intake 1 hour before bed to avoid waking up at night.
- Keep a consistent routine — wake and sleep at the same time even on weekends.
- Add calming rituals like reading, journaling, or prayer to your pre-sleep routine.

**Medical & Mental Health Checkups**
- If sleep issues persist (like insomnia, waking up frequently), consult a sleep specialist.
- Poor sleep can be a symptom of anxiety, depression, or hormonal imbalance — talk to a psychologist if needed.
- Get your vitamin D, iron, and thyroid levels checked — deficiencies can impact sleep.
- Consider an annual wellness exam to rule out sleep apnea, chronic fatigue, or stress-related conditions.
";

const CONCLUSION: &str = "\
**Conclusion**
Your sleep is not just rest — it's your body's daily healing mechanism. Improve it by making \
small, consistent changes to your routine, mindset, and health awareness. Sleep well, live better!
";

/// Names of the rules that fire for `summary`, in table order.
pub fn matching_rules(summary: &SleepSummary) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| (rule.applies)(summary))
        .map(|rule| rule.name)
        .collect()
}

/// Builds the insight report for a chronological window.
pub fn generate(records: &[SleepRecord]) -> String {
    let Some(summary) = stats::summarize(records) else {
        return NO_DATA.to_string();
    };
    debug!(nights = summary.count, rules = ?matching_rules(&summary), "insight rules matched");
    render(&summary)
}

pub fn render(summary: &SleepSummary) -> String {
    let mut output = String::new();

    let issues = if summary.issue_frequency.is_empty() {
        "None".to_string()
    } else {
        summary
            .issue_frequency
            .iter()
            .map(|entry| format!("{} ({} times)", stats::format_issue(&entry.issue), entry.count))
            .collect::<Vec<String>>()
            .join(", ")
    };

    let _ = writeln!(output, "**Sleep Insights Summary**");
    let _ = writeln!(output, "- Average Sleep Duration: {:.1} hours", summary.average);
    let _ = writeln!(
        output,
        "- Nights with Poor Sleep Quality: {}",
        summary.poor_quality_nights
    );
    let _ = writeln!(output, "- Reported Issues: {issues}");
    let _ = writeln!(output);

    let _ = writeln!(output, "**Duration Assessment**");
    write_section(&mut output, summary, Section::Duration);
    let _ = writeln!(output);

    let _ = writeln!(output, "**Sleep Timing Patterns**");
    let _ = writeln!(
        output,
        "- Average Sleep Time: {}",
        clock_or_na(summary.onset_average)
    );
    let _ = writeln!(
        output,
        "- Average Wake-up Time: {}",
        clock_or_na(summary.wake_average)
    );
    write_section(&mut output, summary, Section::Timing);
    let _ = writeln!(output);

    output.push_str(RECOMMENDATIONS);
    let _ = writeln!(output);
    output.push_str(CONCLUSION);
    output
}

fn write_section(output: &mut String, summary: &SleepSummary, section: Section) {
    for rule in RULES.iter().filter(|rule| rule.section == section) {
        if (rule.applies)(summary) {
            let _ = writeln!(output, "- {}", (rule.render)(summary));
        }
    }
}

fn clock_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), stats::format_clock)
}
