use console::Style;
use histeq_core::equalize::scale_factor;
use histeq_core::pipeline::config::PipelineConfig;
use histeq_core::pipeline::EqualizationOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &PipelineConfig, device: &str) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Histogram Equalization"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(22)));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    match config.output {
        Some(ref path) => println!(
            "  {:<14}{}",
            s.label.apply_to("Output"),
            s.path.apply_to(path.display())
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Output"),
            s.disabled.apply_to("not written")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(device)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Bins"),
        s.value.apply_to(config.num_bins)
    );
    println!();
}

/// Image facts followed by every intermediate table of the run.
pub fn print_equalization(out: &EqualizationOutput) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Result"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Layout"),
        s.method.apply_to(out.layout)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Samples"),
        s.value.apply_to(out.sample_count)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Max level"),
        s.value.apply_to(out.max_intensity)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Bin spread"),
        s.value
            .apply_to(format!("{:.4}", scale_factor(out.histogram.len())))
    );
    println!();

    println!("Histogram = {:?}", out.histogram);
    println!("Cumulative Hist = {:?}", out.cdf);
    println!("Normalized Hist = {:?}", out.normalized);
    println!("Scaled Hist = {:?}", out.lut);
}
