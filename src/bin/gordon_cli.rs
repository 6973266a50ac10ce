#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("gordon_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use gordon_engine::geom::{
        DeBoorEvaluator, GeomError, GeometryEvaluator, NurbsCurve3, NurbsSurface, Point3, Quantity, Tolerance,
        UvDirection,
    };
    use gordon_engine::gordon::{
        GordonDiagnostics, GordonOptions, GordonSurface, IntersectionOptions, PlacementOptions, build_gordon_surface,
    };
    use serde::{Deserialize, Serialize};
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    const OBJ_SAMPLES: usize = 24;

    const USAGE: &str = r#"gordon_cli (gordon-engine)

USAGE:
  gordon_cli list
  gordon_cli run <scenario|all> [options]
  gordon_cli build <network.json> [options]

SCENARIOS:
  paraboloid_3x3
  cubic_sheet_4x3
  scrambled_paraboloid

NETWORK FILE (build):
  { "uCurves": [curve, ...], "vCurves": [curve, ...], "options": { ... } }
  curve:   { "degree", "controlPoints", "knots", "weights"?, "isPeriodic"? }
  options: degreeU, degreeV, knotTolerance, intersectionTolerance,
           intersectionSamples, minSpacing (all optional)

OPTIONS:
  --out-dir <dir>    Write <name>.json and <name>.obj to this dir (required for `run all`)
  --json <path>      Write the surface record and diagnostics as JSON
  --obj <path>       Write a sampled triangle mesh as OBJ
  --overwrite        Overwrite existing output files
  -v, --verbose      Log pipeline progress to stderr
  -h, --help         Show this help
"#;

    pub fn run() -> Result<(), String> {
        let mut raw: Vec<String> = std::env::args().skip(1).collect();
        let verbose = take_flag(&mut raw, &["-v", "--verbose"]);
        init_logger(verbose)?;
        let mut args = Args::new(raw);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                for scenario in Scenario::ALL {
                    println!("{}", scenario.name());
                }
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "build" => cmd_build(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    // ── logging ─────────────────────────────────────────────────────────────

    cfg_if::cfg_if! {
        if #[cfg(feature = "debug_logs")] {
            const DEFAULT_LEVEL: log::LevelFilter = log::LevelFilter::Debug;
        } else {
            const DEFAULT_LEVEL: log::LevelFilter = log::LevelFilter::Warn;
        }
    }

    /// `RUST_LOG` still overrides the level picked here.
    fn init_logger(verbose: bool) -> Result<(), String> {
        let level = if verbose { log::LevelFilter::Trace } else { DEFAULT_LEVEL };
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init()
            .map_err(|e| format!("install logger: {e}"))
    }

    // ── commands ────────────────────────────────────────────────────────────

    struct Outputs {
        out_dir: Option<PathBuf>,
        json: Option<PathBuf>,
        obj: Option<PathBuf>,
        overwrite: bool,
    }

    fn parse_outputs(args: &mut Args) -> Result<Option<Outputs>, String> {
        let mut outputs = Outputs {
            out_dir: None,
            json: None,
            obj: None,
            overwrite: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => outputs.out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--json" => outputs.json = Some(PathBuf::from(args.value("--json")?)),
                "--obj" => outputs.obj = Some(PathBuf::from(args.value("--obj")?)),
                "--overwrite" => outputs.overwrite = true,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(None);
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }
        if outputs.out_dir.is_some() && (outputs.json.is_some() || outputs.obj.is_some()) {
            return Err("use either --out-dir or --json/--obj (not both)".to_string());
        }
        Ok(Some(outputs))
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let name = args.next().ok_or("missing scenario name")?;
        let Some(outputs) = parse_outputs(args)? else {
            return Ok(());
        };

        let scenarios: Vec<Scenario> = if name == "all" {
            if outputs.out_dir.is_none() && (outputs.json.is_some() || outputs.obj.is_some()) {
                return Err("`run all` writes files only with --out-dir".to_string());
            }
            Scenario::ALL.to_vec()
        } else {
            vec![Scenario::from_str(&name).ok_or_else(|| unknown_scenario(&name))?]
        };

        for scenario in scenarios {
            let (u_curves, v_curves) = scenario.network().map_err(|e| format!("{}: {e}", scenario.name()))?;
            let result = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default())
                .map_err(|e| format!("{}: {e}", scenario.name()))?;
            let report = interpolation_report(&result)?;
            println!(
                "{}: grid {}x{}, degrees ({}, {}) | curve error {:.3e}, crossing error {:.3e} | {}",
                scenario.name(),
                result.surface.u_count,
                result.surface.v_count,
                result.surface.degree_u,
                result.surface.degree_v,
                report.curve_error,
                report.crossing_error,
                result.diagnostics.summary()
            );
            write_outputs(scenario.name(), &result.surface, &result.diagnostics, &outputs)?;
        }
        Ok(())
    }

    fn cmd_build(args: &mut Args) -> Result<(), String> {
        let input = PathBuf::from(args.next().ok_or("missing network file")?);
        let Some(outputs) = parse_outputs(args)? else {
            return Ok(());
        };

        let text = fs::read_to_string(&input).map_err(|e| format!("read {}: {e}", input.display()))?;
        let network: NetworkFile =
            serde_json::from_str(&text).map_err(|e| format!("parse {}: {e}", input.display()))?;
        let options = network.options.unwrap_or_default().into_options();
        let result = build_gordon_surface(&network.u_curves, &network.v_curves, &options)
            .map_err(|e| e.to_string())?;
        eprint!("{}", result.diagnostics);

        let name = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("gordon")
            .to_string();
        if outputs.out_dir.is_none() && outputs.json.is_none() {
            let record = SurfaceOutput {
                surface: &result.surface,
                diagnostics: &result.diagnostics,
            };
            let json = serde_json::to_string_pretty(&record).map_err(|e| format!("serialize: {e}"))?;
            println!("{json}");
        }
        write_outputs(&name, &result.surface, &result.diagnostics, &outputs)
    }

    // ── network file ────────────────────────────────────────────────────────

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct NetworkFile {
        u_curves: Vec<NurbsCurve3>,
        v_curves: Vec<NurbsCurve3>,
        options: Option<NetworkOptions>,
    }

    #[derive(Default, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct NetworkOptions {
        degree_u: Option<usize>,
        degree_v: Option<usize>,
        knot_tolerance: Option<f64>,
        intersection_tolerance: Option<Quantity>,
        intersection_samples: Option<usize>,
        min_spacing: Option<f64>,
    }

    impl NetworkOptions {
        fn into_options(self) -> GordonOptions {
            let defaults = GordonOptions::default();
            let mut options = defaults.with_degrees(
                self.degree_u.unwrap_or(defaults.degree_u),
                self.degree_v.unwrap_or(defaults.degree_v),
            );
            if let Some(eps) = self.knot_tolerance {
                options = options.with_knot_tolerance(Tolerance::new(eps));
            }
            if let Some(tolerance) = self.intersection_tolerance {
                options = options.with_intersection_tolerance(tolerance);
            }
            if let Some(samples) = self.intersection_samples {
                options = options.with_intersection(IntersectionOptions::default().with_samples(samples));
            }
            if let Some(spacing) = self.min_spacing {
                options = options.with_placement(PlacementOptions::default().with_min_spacing(spacing));
            }
            options
        }
    }

    #[derive(Serialize)]
    struct SurfaceOutput<'a> {
        surface: &'a NurbsSurface,
        diagnostics: &'a GordonDiagnostics,
    }

    // ── scenarios ───────────────────────────────────────────────────────────

    #[derive(Debug, Clone, Copy)]
    enum Scenario {
        Paraboloid3x3,
        CubicSheet4x3,
        ScrambledParaboloid,
    }

    impl Scenario {
        const ALL: &'static [Self] = &[Self::Paraboloid3x3, Self::CubicSheet4x3, Self::ScrambledParaboloid];

        fn name(self) -> &'static str {
            match self {
                Self::Paraboloid3x3 => "paraboloid_3x3",
                Self::CubicSheet4x3 => "cubic_sheet_4x3",
                Self::ScrambledParaboloid => "scrambled_paraboloid",
            }
        }

        fn from_str(name: &str) -> Option<Self> {
            Self::ALL.iter().copied().find(|s| s.name() == name)
        }

        fn network(self) -> Result<(Vec<NurbsCurve3>, Vec<NurbsCurve3>), GeomError> {
            Ok(match self {
                Self::Paraboloid3x3 => iso_network(2, paraboloid, &[0.0, 0.5, 1.0], &[0.0, 0.5, 1.0])?,
                Self::CubicSheet4x3 => iso_network(3, cubic_sheet, &[0.0, 0.5, 1.0], &[0.0, 0.3, 0.7, 1.0])?,
                Self::ScrambledParaboloid => {
                    let (u, v) = iso_network(2, paraboloid, &[0.0, 0.5, 1.0], &[0.0, 0.5, 1.0])?;
                    (
                        vec![u[0].clone(), u[2].reversed(), u[1].clone()],
                        vec![v[2].clone(), v[0].clone(), v[1].clone()],
                    )
                }
            })
        }
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = format!("unknown scenario `{name}`\n\navailable scenarios:\n");
        for scenario in Scenario::ALL {
            msg.push_str("  ");
            msg.push_str(scenario.name());
            msg.push('\n');
        }
        msg
    }

    fn paraboloid(u: f64, v: f64) -> Point3 {
        Point3::new(u, v, u * u * (1.0 - v) + v * v)
    }

    fn cubic_sheet(u: f64, v: f64) -> Point3 {
        Point3::new(u, v, u * u * u * v - 2.0 * u * v * v + 0.5 * v * v * v)
    }

    /// Exact polynomial iso-curves of `surface`.
    #[allow(clippy::cast_precision_loss)]
    fn iso_network(
        degree: usize,
        surface: fn(f64, f64) -> Point3,
        u_levels: &[f64],
        v_levels: &[f64],
    ) -> Result<(Vec<NurbsCurve3>, Vec<NurbsCurve3>), GeomError> {
        let eval = DeBoorEvaluator::new();
        let params: Vec<f64> = (0..=degree).map(|k| k as f64 / degree as f64).collect();
        let curve = |f: &dyn Fn(f64) -> Point3| {
            let points: Vec<Point3> = params.iter().map(|&t| f(t)).collect();
            eval.interpolate(&points, &params, degree)
        };
        let u_curves = v_levels
            .iter()
            .map(|&v| curve(&|u| surface(u, v)))
            .collect::<Result<Vec<_>, _>>()?;
        let v_curves = u_levels
            .iter()
            .map(|&u| curve(&|v| surface(u, v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((u_curves, v_curves))
    }

    struct InterpolationReport {
        curve_error: f64,
        crossing_error: f64,
    }

    /// How far the surface strays from the curves and crossings it should hit.
    #[allow(clippy::cast_precision_loss)]
    fn interpolation_report(result: &GordonSurface) -> Result<InterpolationReport, String> {
        const SAMPLES: usize = 32;
        let eval = DeBoorEvaluator::new();
        let diag = &result.diagnostics;
        let surface = &result.surface;
        let mut curve_error = 0.0_f64;
        let mut crossing_error = 0.0_f64;

        for k in 0..=SAMPLES {
            let t = k as f64 / SAMPLES as f64;
            for (curve, &v) in result.u_curves.iter().zip(&diag.v_placements) {
                let a = eval.surface_point(surface, t, v).map_err(|e| e.to_string())?;
                let b = eval.curve_point(curve, t).map_err(|e| e.to_string())?;
                curve_error = curve_error.max(a.distance_to(b));
            }
            for (curve, &u) in result.v_curves.iter().zip(&diag.u_placements) {
                let a = eval.surface_point(surface, u, t).map_err(|e| e.to_string())?;
                let b = eval.curve_point(curve, t).map_err(|e| e.to_string())?;
                curve_error = curve_error.max(a.distance_to(b));
            }
        }
        for (curve, &v) in result.u_curves.iter().zip(&diag.v_placements) {
            let iso = surface.iso_curve(UvDirection::V, v).map_err(|e| e.to_string())?;
            for &u in &diag.u_placements {
                let on_surface = eval.surface_point(surface, u, v).map_err(|e| e.to_string())?;
                let on_iso = eval.curve_point(&iso, u).map_err(|e| e.to_string())?;
                let on_curve = eval.curve_point(curve, u).map_err(|e| e.to_string())?;
                crossing_error = crossing_error
                    .max(on_surface.distance_to(on_curve))
                    .max(on_iso.distance_to(on_surface));
            }
        }
        Ok(InterpolationReport {
            curve_error,
            crossing_error,
        })
    }

    // ── output ──────────────────────────────────────────────────────────────

    fn write_outputs(
        name: &str,
        surface: &NurbsSurface,
        diagnostics: &GordonDiagnostics,
        outputs: &Outputs,
    ) -> Result<(), String> {
        let (json_path, obj_path) = match outputs.out_dir.as_ref() {
            Some(dir) => (Some(dir.join(format!("{name}.json"))), Some(dir.join(format!("{name}.obj")))),
            None => (outputs.json.clone(), outputs.obj.clone()),
        };
        if let Some(path) = json_path.as_deref() {
            let record = SurfaceOutput { surface, diagnostics };
            let json = serde_json::to_string_pretty(&record).map_err(|e| format!("serialize: {e}"))?;
            write_text_file(path, &json, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        }
        if let Some(path) = obj_path.as_deref() {
            write_obj_file(path, surface, name, outputs.overwrite)?;
            eprintln!("wrote {}", path.display());
        }
        Ok(())
    }

    fn prepare_path(path: &Path, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        Ok(())
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        prepare_path(path, overwrite)?;
        let text = if text.ends_with('\n') { text.to_string() } else { format!("{text}\n") };
        fs::write(path, text).map_err(|e| format!("write {}: {e}", path.display()))
    }

    /// Sample the surface on a regular parameter grid and write it as triangles.
    #[allow(clippy::cast_precision_loss)]
    fn write_obj_file(path: &Path, surface: &NurbsSurface, name: &str, overwrite: bool) -> Result<(), String> {
        prepare_path(path, overwrite)?;
        let eval = DeBoorEvaluator::new();
        let (u0, u1) = surface.domain_u();
        let (v0, v1) = surface.domain_v();
        let n = OBJ_SAMPLES;

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);
        writeln!(w, "# gordon-engine gordon_cli").map_err(|e| format!("write obj: {e}"))?;
        writeln!(w, "o {name}").map_err(|e| format!("write obj: {e}"))?;

        for i in 0..=n {
            let u = u0 + (u1 - u0) * i as f64 / n as f64;
            for j in 0..=n {
                let v = v0 + (v1 - v0) * j as f64 / n as f64;
                let p = eval.surface_point(surface, u, v).map_err(|e| e.to_string())?;
                writeln!(w, "v {} {} {}", p.x, p.y, p.z).map_err(|e| format!("write obj: {e}"))?;
            }
        }
        let index = |i: usize, j: usize| i * (n + 1) + j + 1;
        for i in 0..n {
            for j in 0..n {
                let (a, b, c, d) = (index(i, j), index(i + 1, j), index(i + 1, j + 1), index(i, j + 1));
                writeln!(w, "f {a} {b} {c}").map_err(|e| format!("write obj: {e}"))?;
                writeln!(w, "f {a} {c} {d}").map_err(|e| format!("write obj: {e}"))?;
            }
        }
        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    // ── args ────────────────────────────────────────────────────────────────

    fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
        let before = args.len();
        args.retain(|a| !names.contains(&a.as_str()));
        args.len() != before
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next().ok_or_else(|| format!("missing value for {flag}"))
        }
    }

}
