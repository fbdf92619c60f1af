use std::path::PathBuf;

use clap::{Args, Parser};
use kurbo::BezPath;
use svg::Document;

use bezregion::{generators, BinaryOp, Contour, FillRule, Region};

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Op {
    Union,
    Intersection,
    Xor,
    Difference,
}

impl From<Op> for BinaryOp {
    fn from(op: Op) -> BinaryOp {
        match op {
            Op::Union => BinaryOp::Union,
            Op::Intersection => BinaryOp::Intersection,
            Op::Xor => BinaryOp::Xor,
            Op::Difference => BinaryOp::Difference,
        }
    }
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum Example {
    Checkerboard,
    SlantedCheckerboard,
    Rings,
}

/// Combines two shapes and prints (or draws) the result.
#[derive(Parser)]
struct Cli {
    #[arg(long, value_enum, default_value = "union")]
    op: Op,

    #[command(flatten)]
    input: Input,

    /// Fill with the non-zero rule instead of the even-odd one.
    #[arg(long)]
    non_zero: bool,

    /// Draw the inputs and the result to this SVG file, instead of printing
    /// the result's path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Input {
    /// Two SVG path strings.
    #[arg(num_args = 2)]
    paths: Vec<String>,

    #[arg(long)]
    example: Option<Example>,
}

fn get_contours(input: &Input) -> anyhow::Result<(Vec<Contour>, Vec<Contour>)> {
    if let Some(example) = input.example {
        return Ok(match example {
            Example::Checkerboard => generators::checkerboard(10),
            Example::SlantedCheckerboard => generators::slanted_checkerboard(10),
            Example::Rings => {
                let mut a = generators::rings(12);
                let b = a.split_off(6);
                (a, b)
            }
        });
    }

    let [a, b] = input.paths.as_slice() else {
        anyhow::bail!("expected two paths");
    };
    Ok((
        Contour::from_bez_path(&BezPath::from_svg(a)?)?,
        Contour::from_bez_path(&BezPath::from_svg(b)?)?,
    ))
}

fn joined(contours: &[Contour]) -> BezPath {
    let mut ret = BezPath::new();
    for c in contours {
        ret.extend(c.to_bez_path());
    }
    ret
}

pub fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let (shape_a, shape_b) = get_contours(&args.input)?;
    let fill_rule = if args.non_zero {
        FillRule::NonZero
    } else {
        FillRule::EvenOdd
    };

    let a = Region::from_contours(&shape_a, fill_rule)?;
    let b = Region::from_contours(&shape_b, fill_rule)?;
    let result = a.apply(args.op.into(), &b);

    let Some(output) = args.output else {
        println!("{}", result.to_bez_path().to_svg());
        eprintln!(
            "area {}, {} solids",
            result.area(),
            result.solids().len()
        );
        return Ok(());
    };

    let bbox = a.bounding_box().union(b.bounding_box());
    let pad = 1.0 + bbox.width().max(bbox.height()) / 32.0;
    let one_width = bbox.width() + 2.0 * pad;
    let stroke_width = bbox.width().max(bbox.height()) / 512.0;
    let mut document = Document::new().set(
        "viewBox",
        (
            bbox.x0 - pad,
            bbox.y0 - pad,
            one_width * 2.0,
            bbox.height() + 2.0 * pad,
        ),
    );

    // The inputs on the left, the result on the right.
    for (contours, color) in [(&shape_a, "red"), (&shape_b, "blue")] {
        let path = svg::node::element::Path::new()
            .set("stroke", color)
            .set("stroke-width", stroke_width)
            .set("stroke-linejoin", "round")
            .set("opacity", 0.5)
            .set("fill", "none")
            .set("d", joined(contours).to_svg());
        document = document.add(path);
    }

    let shifted = kurbo::Affine::translate((one_width, 0.0)) * result.to_bez_path();
    let path = svg::node::element::Path::new()
        .set("stroke", "black")
        .set("stroke-width", stroke_width)
        .set("stroke-linejoin", "round")
        .set("fill-rule", "nonzero")
        .set("fill", "#0A9396")
        .set("d", shifted.to_svg());
    document = document.add(path);

    svg::save(&output, &document)?;
    Ok(())
}
