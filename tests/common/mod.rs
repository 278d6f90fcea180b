//! Shared test models.

use std::sync::Arc;

use arcstr::ArcStr;
use lazy_static::lazy_static;
use strata::elab::ElabCtx;
use strata::error::{ErrorSource, Result};
use strata::model::{Bindings, Model, ModelRef, Process, Value, Wire, WireArray};

fn wire_arg(args: &Bindings, name: &str) -> Result<Wire> {
    args.get(name)
        .and_then(Value::as_wire)
        .cloned()
        .ok_or_else(|| ErrorSource::InvalidArgs(format!("missing wire argument `{name}`")).into())
}

fn array_arg(args: &Bindings, name: &str) -> Result<WireArray> {
    args.get(name)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ErrorSource::InvalidArgs(format!("missing array argument `{name}`")).into())
}

fn int_arg(args: &Bindings, name: &str, default: i64) -> i64 {
    match args.get(name) {
        Some(Value::Int(v)) => *v,
        _ => default,
    }
}

/// 1-bit full adder.
pub struct OnebitFullAdder;

impl Model for OnebitFullAdder {
    fn name(&self) -> ArcStr {
        arcstr::literal!("onebit_full_adder")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec![
            "a".into(),
            "b".into(),
            "s".into(),
            "cin".into(),
            "cout".into(),
        ]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let a = wire_arg(args, "a")?;
        let b = wire_arg(args, "b")?;
        let s = wire_arg(args, "s")?;
        let cin = wire_arg(args, "cin")?;
        let cout = wire_arg(args, "cout")?;
        ctx.add_process(
            Process::new("adder_logic")
                .sense(&a)
                .sense(&b)
                .sense(&cin)
                .drive(&s)
                .drive(&cout)
                .stmt(format!(
                    "{} <= {} xor {} xor {};",
                    s.name(),
                    a.name(),
                    b.name(),
                    cin.name()
                ))
                .stmt(format!(
                    "{} <= ({} and {}) or ({} and ({} xor {}));",
                    cout.name(),
                    a.name(),
                    b.name(),
                    cin.name(),
                    a.name(),
                    b.name()
                )),
        );
        Ok(())
    }
}

/// Multi-bit full adder, structural description: a ripple-carry chain of
/// one-bit adders.
pub struct StructuralAdder;

impl Model for StructuralAdder {
    fn name(&self) -> ArcStr {
        arcstr::literal!("structural_adder")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec![
            "a".into(),
            "b".into(),
            "s".into(),
            "cin".into(),
            "cout".into(),
            "width".into(),
        ]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let a = array_arg(args, "a")?;
        let b = array_arg(args, "b")?;
        let s = array_arg(args, "s")?;
        let cin = wire_arg(args, "cin")?;
        let cout = wire_arg(args, "cout")?;
        let width = int_arg(args, "width", 8) as usize;

        let carries = ctx.wire_array("carry", 1, width - 1);
        for i in 0..width {
            let ci = if i == 0 { cin.clone() } else { carries.get(i - 1) };
            let co = if i == width - 1 {
                cout.clone()
            } else {
                carries.get(i)
            };
            ctx.instance(
                "adder",
                &ONEBIT,
                Bindings::new()
                    .with("a", a.get(i))
                    .with("b", b.get(i))
                    .with("s", s.get(i))
                    .with("cin", ci)
                    .with("cout", co),
            )?;
        }
        Ok(())
    }
}

/// Test bench instantiating one structural adder.
pub struct AdderBench;

impl Model for AdderBench {
    fn name(&self) -> ArcStr {
        arcstr::literal!("adder_bench")
    }

    fn params(&self) -> Vec<ArcStr> {
        Vec::new()
    }

    fn elaborate(&self, ctx: &mut ElabCtx, _args: &Bindings) -> Result<()> {
        let a = ctx.wire_array("a", 1, 8);
        let b = ctx.wire_array("b", 1, 8);
        let s = ctx.wire_array("s", 1, 8);
        let cin = ctx.wire("cin", 1);
        let cout = ctx.wire("cout", 1);

        ctx.instance(
            "adder_inst",
            &STRUCTURAL_ADDER,
            Bindings::new()
                .with("a", &a)
                .with("b", &b)
                .with("s", &s)
                .with("cin", &cin)
                .with("cout", &cout)
                .with("width", 8i64),
        )?;

        ctx.add_process(
            Process::new("stimulus")
                .sense(&cout)
                .drive(&cin)
                .stmt(format!("{} <= {};", cin.name(), cout.name())),
        );
        Ok(())
    }
}

/// Simple register, data width passed explicitly.
pub struct RegWidth;

impl Model for RegWidth {
    fn name(&self) -> ArcStr {
        arcstr::literal!("reg_width")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec![
            "clk".into(),
            "rst".into(),
            "d".into(),
            "q".into(),
            "width".into(),
        ]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let clk = wire_arg(args, "clk")?;
        let rst = wire_arg(args, "rst")?;
        let d = wire_arg(args, "d")?;
        let q = wire_arg(args, "q")?;
        let width = int_arg(args, "width", 8);
        ctx.add_process(
            Process::new("reg")
                .on_posedge(&clk)
                .on_negedge(&rst)
                .drive(&q)
                .stmt(format!("if {} = '0' then", rst.name()))
                .stmt(format!("    {} <= (others => '0');", q.name()))
                .stmt(format!("elsif rising_edge({}) then", clk.name()))
                .stmt(format!(
                    "    {} <= {}({} downto 0);",
                    q.name(),
                    d.name(),
                    width - 1
                ))
                .stmt("end if;"),
        );
        Ok(())
    }
}

/// Four registers of distinct widths: every call forks its own cluster.
pub struct MultiReg;

pub const MULTI_REG_WIDTHS: [usize; 4] = [8, 4, 12, 16];

impl Model for MultiReg {
    fn name(&self) -> ArcStr {
        arcstr::literal!("multi_reg")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["clk".into(), "rst".into(), "d".into(), "eq".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let clk = wire_arg(args, "clk")?;
        let rst = wire_arg(args, "rst")?;
        let d = wire_arg(args, "d")?;
        let eq = wire_arg(args, "eq")?;

        let mut temps = Vec::new();
        for (i, width) in MULTI_REG_WIDTHS.iter().enumerate() {
            temps.push(ctx.wire(&format!("temp_{i}"), *width));
        }
        for (i, width) in MULTI_REG_WIDTHS.iter().enumerate() {
            ctx.instance(
                "regs",
                &REG_WIDTH,
                Bindings::new()
                    .with("clk", &clk)
                    .with("rst", &rst)
                    .with("d", &d)
                    .with("q", &temps[i])
                    .with("width", *width as i64),
            )?;
        }

        let mut eq_proc = Process::new("eq_proc").drive(&eq);
        for temp in temps.iter() {
            eq_proc = eq_proc.sense(temp);
        }
        ctx.add_process(eq_proc.stmt(format!(
            "{} <= '1' when {}(3 downto 0) = {}(3 downto 0) else '0';",
            eq.name(),
            temps[0].name(),
            temps[1].name()
        )));
        Ok(())
    }
}

/// Two registers with identical bound arguments: one shared component.
pub struct DualReg;

impl Model for DualReg {
    fn name(&self) -> ArcStr {
        arcstr::literal!("dual_reg")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["clk".into(), "rst".into(), "d".into(), "eq".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let clk = wire_arg(args, "clk")?;
        let rst = wire_arg(args, "rst")?;
        let d = wire_arg(args, "d")?;
        let eq = wire_arg(args, "eq")?;

        let temp_a = ctx.wire("temp_a", 8);
        let temp_b = ctx.wire("temp_b", 8);
        for temp in [&temp_a, &temp_b] {
            ctx.instance(
                "regs",
                &REG_WIDTH,
                Bindings::new()
                    .with("clk", &clk)
                    .with("rst", &rst)
                    .with("d", &d)
                    .with("q", temp)
                    .with("width", 8i64),
            )?;
        }
        ctx.add_process(
            Process::new("compare")
                .sense(&temp_a)
                .sense(&temp_b)
                .drive(&eq)
                .stmt(format!(
                    "{} <= '1' when {} = {} else '0';",
                    eq.name(),
                    temp_a.name(),
                    temp_b.name()
                )),
        );
        Ok(())
    }
}

/// A leaf whose body is a raw code block: unsupported in hierarchical mode.
pub struct RawLeaf;

impl Model for RawLeaf {
    fn name(&self) -> ArcStr {
        arcstr::literal!("raw_leaf")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["d".into(), "q".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let d = wire_arg(args, "d")?;
        let q = wire_arg(args, "q")?;
        ctx.raw_code(format!("    {} <= {};", q.name(), d.name()));
        Ok(())
    }
}

/// Wraps a raw-code leaf under a normal process.
pub struct RawTop;

impl Model for RawTop {
    fn name(&self) -> ArcStr {
        arcstr::literal!("raw_top")
    }

    fn params(&self) -> Vec<ArcStr> {
        Vec::new()
    }

    fn elaborate(&self, ctx: &mut ElabCtx, _args: &Bindings) -> Result<()> {
        let d = ctx.wire("d", 1);
        let q = ctx.wire("q", 1);
        ctx.instance(
            "rawi",
            &RAW_LEAF,
            Bindings::new().with("d", &d).with("q", &q),
        )?;
        ctx.add_process(
            Process::new("drv")
                .sense(&q)
                .drive(&d)
                .stmt(format!("{} <= not {};", d.name(), q.name())),
        );
        Ok(())
    }
}

/// A follower whose input formal collides with a VHDL reserved word.
pub struct Follower;

impl Model for Follower {
    fn name(&self) -> ArcStr {
        arcstr::literal!("follower")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["in".into(), "q".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let input = wire_arg(args, "in")?;
        let q = wire_arg(args, "q")?;
        ctx.add_process(
            Process::new("follow")
                .sense(&input)
                .drive(&q)
                .stmt(format!("{} <= {};", q.name(), input.name())),
        );
        Ok(())
    }
}

pub struct ReservedTop;

impl Model for ReservedTop {
    fn name(&self) -> ArcStr {
        arcstr::literal!("reserved_top")
    }

    fn params(&self) -> Vec<ArcStr> {
        Vec::new()
    }

    fn elaborate(&self, ctx: &mut ElabCtx, _args: &Bindings) -> Result<()> {
        let x = ctx.wire("x", 1);
        let y = ctx.wire("y", 1);
        ctx.instance(
            "fol",
            &FOLLOWER,
            Bindings::new().with("in", &x).with("q", &y),
        )?;
        ctx.add_process(
            Process::new("loopback")
                .sense(&y)
                .drive(&x)
                .stmt(format!("{} <= not {};", x.name(), y.name())),
        );
        Ok(())
    }
}

/// Carries an implicit receiver-style first argument that the converter
/// must strip before recursing.
pub struct SelfishLeaf;

impl Model for SelfishLeaf {
    fn name(&self) -> ArcStr {
        arcstr::literal!("selfish_leaf")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["self".into(), "d".into(), "q".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let d = wire_arg(args, "d")?;
        let q = wire_arg(args, "q")?;
        ctx.add_process(
            Process::new("pass")
                .sense(&d)
                .drive(&q)
                .stmt(format!("{} <= {};", q.name(), d.name())),
        );
        Ok(())
    }
}

pub struct SelfishTop;

impl Model for SelfishTop {
    fn name(&self) -> ArcStr {
        arcstr::literal!("selfish_top")
    }

    fn params(&self) -> Vec<ArcStr> {
        Vec::new()
    }

    fn elaborate(&self, ctx: &mut ElabCtx, _args: &Bindings) -> Result<()> {
        let d = ctx.wire("d", 1);
        let q = ctx.wire("q", 1);
        ctx.instance(
            "leaf",
            &SELFISH_LEAF,
            Bindings::new()
                .with("self", 1i64)
                .with("d", &d)
                .with("q", &q),
        )?;
        ctx.add_process(
            Process::new("drv")
                .sense(&q)
                .drive(&d)
                .stmt(format!("{} <= not {};", d.name(), q.name())),
        );
        Ok(())
    }
}

/// A two-input mux; distinct `sel_width` values fork clusters `mux_0`,
/// `mux_1`, ...
pub struct Mux;

impl Model for Mux {
    fn name(&self) -> ArcStr {
        arcstr::literal!("mux")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["d".into(), "q".into(), "sel_width".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let d = wire_arg(args, "d")?;
        let q = wire_arg(args, "q")?;
        ctx.add_process(
            Process::new("route")
                .sense(&d)
                .drive(&q)
                .stmt(format!("{} <= {};", q.name(), d.name())),
        );
        Ok(())
    }
}

/// A callee whose literal name collides with `mux`'s first suffixed
/// cluster.
pub struct MuxZero;

impl Model for MuxZero {
    fn name(&self) -> ArcStr {
        arcstr::literal!("mux_0")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["d".into(), "q".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let d = wire_arg(args, "d")?;
        let q = wire_arg(args, "q")?;
        ctx.add_process(
            Process::new("route")
                .sense(&d)
                .drive(&q)
                .stmt(format!("{} <= {};", q.name(), d.name())),
        );
        Ok(())
    }
}

pub struct ConflictTop;

impl Model for ConflictTop {
    fn name(&self) -> ArcStr {
        arcstr::literal!("conflict_top")
    }

    fn params(&self) -> Vec<ArcStr> {
        Vec::new()
    }

    fn elaborate(&self, ctx: &mut ElabCtx, _args: &Bindings) -> Result<()> {
        let d = ctx.wire("d", 1);
        let q0 = ctx.wire("q0", 1);
        let q1 = ctx.wire("q1", 1);
        let q2 = ctx.wire("q2", 1);
        ctx.instance(
            "m1",
            &MUX,
            Bindings::new()
                .with("d", &d)
                .with("q", &q0)
                .with("sel_width", 1i64),
        )?;
        ctx.instance(
            "m2",
            &MUX,
            Bindings::new()
                .with("d", &d)
                .with("q", &q1)
                .with("sel_width", 2i64),
        )?;
        ctx.instance(
            "m3",
            &MUX_ZERO,
            Bindings::new().with("d", &d).with("q", &q2),
        )?;
        ctx.add_process(
            Process::new("drv")
                .sense(&q0)
                .drive(&d)
                .stmt(format!("{} <= not {};", d.name(), q0.name())),
        );
        Ok(())
    }
}

/// Declares an enumerated type and a constant, exercising session state.
pub struct EnumControl;

impl Model for EnumControl {
    fn name(&self) -> ArcStr {
        arcstr::literal!("enum_control")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["clk".into(), "q".into()]
    }

    fn elaborate(&self, ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let clk = wire_arg(args, "clk")?;
        let q = wire_arg(args, "q")?;
        ctx.enum_type("state_t", ["IDLE", "RUN"]);
        ctx.constant("CYCLES", 10);
        ctx.add_process(
            Process::new("step")
                .on_posedge(&clk)
                .drive(&q)
                .stmt(format!("{} <= '1';", q.name())),
        );
        Ok(())
    }
}

/// A constructor whose elaboration fails outright.
pub struct Broken;

impl Model for Broken {
    fn name(&self) -> ArcStr {
        arcstr::literal!("broken")
    }

    fn params(&self) -> Vec<ArcStr> {
        vec!["d".into()]
    }

    fn elaborate(&self, _ctx: &mut ElabCtx, args: &Bindings) -> Result<()> {
        let _ = wire_arg(args, "d")?;
        Err(ErrorSource::Model("elaboration rejected".to_string()).into())
    }
}

lazy_static! {
    pub static ref ONEBIT: ModelRef = Arc::new(OnebitFullAdder);
    pub static ref STRUCTURAL_ADDER: ModelRef = Arc::new(StructuralAdder);
    pub static ref ADDER_BENCH: ModelRef = Arc::new(AdderBench);
    pub static ref REG_WIDTH: ModelRef = Arc::new(RegWidth);
    pub static ref MULTI_REG: ModelRef = Arc::new(MultiReg);
    pub static ref DUAL_REG: ModelRef = Arc::new(DualReg);
    pub static ref RAW_LEAF: ModelRef = Arc::new(RawLeaf);
    pub static ref RAW_TOP: ModelRef = Arc::new(RawTop);
    pub static ref FOLLOWER: ModelRef = Arc::new(Follower);
    pub static ref RESERVED_TOP: ModelRef = Arc::new(ReservedTop);
    pub static ref ENUM_CONTROL: ModelRef = Arc::new(EnumControl);
    pub static ref SELFISH_LEAF: ModelRef = Arc::new(SelfishLeaf);
    pub static ref SELFISH_TOP: ModelRef = Arc::new(SelfishTop);
    pub static ref MUX: ModelRef = Arc::new(Mux);
    pub static ref MUX_ZERO: ModelRef = Arc::new(MuxZero);
    pub static ref CONFLICT_TOP: ModelRef = Arc::new(ConflictTop);
    pub static ref BROKEN: ModelRef = Arc::new(Broken);
}

/// Bound arguments for [`MultiReg`] and [`DualReg`].
pub fn reg_bench_args() -> Bindings {
    Bindings::new()
        .with("clk", Wire::new("clk", 1))
        .with("rst", Wire::new("rst", 1))
        .with("d", Wire::new("d", 16))
        .with("eq", Wire::new("eq", 1))
}
