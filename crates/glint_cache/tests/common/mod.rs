//! Shader and program builders shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use glint_ir::{
    Assignment, Call, Constant, ConstantValue, ExprOp, Expression, IfStmt, InterfacePacking,
    Instruction, Interpolation, LodInfo, Loop, LoopJumpMode, Program, Rvalue, SamplerDim,
    ScalarKind, Shader, ShaderStage, Signature, SignatureId, StandardBuiltins, StateSlot,
    StructField, Swizzle, Texture, TextureOp, Type, TypeId, UniformStorage, UniformStorageHeader,
    Variable, VariableFlags, VariableId, VariableMode,
};

/// `float x; x = 1.0;`
pub fn x_shader(stage: ShaderStage, source: &str) -> (Shader, VariableId) {
    let mut shader = Shader::with_source(stage, source);
    let float = shader.types.intern(Type::float());
    let x = shader.declare_variable(Variable::new("x", float, VariableMode::Auto));
    shader.body.push(Instruction::Variable(x));
    shader.body.push(Instruction::Assignment(Assignment {
        lhs: Rvalue::var(x),
        rhs: Rvalue::Constant(Constant::floats(float, &[1.0])),
        condition: None,
        write_mask: 0x1,
    }));
    (shader, x)
}

/// A fragment shader whose `main` calls `twice` before `twice` is declared,
/// and calls the builtin `sin`.
///
/// ```glsl
/// uniform float scale;
/// out float result;
/// void main() { float r; r = twice(scale); result = r; r = sin(r); }
/// float twice(float v) { return v * 2.0; }
/// ```
pub fn forward_call_shader(source: &str) -> Shader {
    let mut shader = Shader::with_source(ShaderStage::Fragment, source);
    let float = shader.types.intern(Type::float());
    let void = shader.types.intern(Type::Void);

    let scale = shader.declare_variable(Variable::new("scale", float, VariableMode::Uniform));
    let result = shader.declare_variable(Variable::new("result", float, VariableMode::ShaderOut));
    shader.body.push(Instruction::Variable(scale));
    shader.body.push(Instruction::Variable(result));

    let main = shader.add_function("main");
    let twice = shader.add_function("twice");

    let v = shader.declare_variable(Variable::new("v", float, VariableMode::FunctionIn));
    let mut twice_sig = Signature::new(twice, float);
    twice_sig.is_defined = true;
    twice_sig.parameters.push(v);
    twice_sig.body.push(Instruction::Return(Some(Rvalue::Expression(Expression {
        ty: float,
        op: ExprOp::Mul,
        operands: vec![
            Rvalue::var(v),
            Rvalue::Constant(Constant::floats(float, &[2.0])),
        ],
    }))));
    let twice_sig = shader.add_signature(twice_sig);

    let sin = shader
        .import_builtin(&StandardBuiltins, "sin", &[float])
        .expect("sin(float) is a standard builtin");

    let r = shader.declare_variable(Variable::new("r", float, VariableMode::Temporary));
    let mut main_sig = Signature::new(main, void);
    main_sig.is_defined = true;
    main_sig.body = vec![
        Instruction::Variable(r),
        Instruction::Call(Call {
            callee: twice_sig,
            actual_parameters: vec![Rvalue::var(scale)],
            return_deref: Some(Rvalue::var(r)),
        }),
        Instruction::Assignment(Assignment {
            lhs: Rvalue::var(result),
            rhs: Rvalue::var(r),
            condition: None,
            write_mask: 0x1,
        }),
        Instruction::Call(Call {
            callee: sin,
            actual_parameters: vec![Rvalue::var(r)],
            return_deref: Some(Rvalue::var(r)),
        }),
    ];
    shader.add_signature(main_sig);

    shader.body.push(Instruction::Function(main));
    shader.body.push(Instruction::Function(twice));
    shader
}

/// A linked vertex + fragment program with one `vec4 color` uniform.
pub fn program(vertex_source: &str, fragment_source: &str) -> Program {
    let mut program = Program::new();
    program.header.link_status = true;
    program.attribute_bindings.insert("position".to_string(), 0);
    program.frag_data_bindings.insert("out_color".to_string(), 0);
    program.uniform_locations.insert("color".to_string(), 0);
    program.uniform_storage.push(UniformStorage {
        name: "color".to_string(),
        header: UniformStorageHeader {
            component_slots: 4,
            ..Default::default()
        },
        values: vec![0x3F80_0000; 4],
        ty: None,
    });

    for (stage, source) in [
        (ShaderStage::Vertex, vertex_source),
        (ShaderStage::Fragment, fragment_source),
    ] {
        let mut shader = Shader::with_source(stage, source);
        let vec4 = shader.types.intern(Type::vec(4));
        let color = shader.declare_variable(Variable::new("color", vec4, VariableMode::Uniform));
        shader.body.push(Instruction::Variable(color));
        program.attach(shader);
    }
    program
}

fn declare(shader: &mut Shader, var: Variable) -> VariableId {
    let id = shader.declare_variable(var);
    shader.body.push(Instruction::Variable(id));
    id
}

fn swizzle(value: Rvalue, components: [u8; 4], count: u8) -> Rvalue {
    Rvalue::Swizzle(Swizzle {
        value: Box::new(value),
        components,
        count,
    })
}

fn binary(ty: TypeId, op: ExprOp, a: Rvalue, b: Rvalue) -> Rvalue {
    Rvalue::Expression(Expression {
        ty,
        op,
        operands: vec![a, b],
    })
}

fn store(lhs: Rvalue, rhs: Rvalue) -> Instruction {
    Instruction::Assignment(Assignment {
        lhs,
        rhs,
        condition: None,
        write_mask: 0xF,
    })
}

/// A fragment shader using every statement and rvalue kind, every texture
/// LOD form, array, struct and interface types, and variables with
/// non-default flags and state slots.
pub fn all_kinds_fragment_shader() -> Shader {
    let mut shader = Shader::new(ShaderStage::Fragment);
    let void = shader.types.intern(Type::Void);
    let float = shader.types.intern(Type::float());
    let int = shader.types.intern(Type::int());
    let bool_ty = shader.types.intern(Type::bool());
    let vec2 = shader.types.intern(Type::vec(2));
    let vec4 = shader.types.intern(Type::vec(4));
    let ivec2 = shader.types.intern(Type::vector(ScalarKind::Int, 2));
    let sampler2d = shader.types.intern(Type::sampler(SamplerDim::D2));
    let shadow2d = shader.types.intern(Type::Sampler {
        dim: SamplerDim::D2,
        base: ScalarKind::Float,
        shadow: true,
        array: false,
    });
    let weights_ty = shader.types.intern(Type::Array {
        element: float,
        length: 3,
    });
    let light = shader.types.intern(Type::Struct {
        name: "Light".to_string(),
        fields: vec![
            StructField {
                name: "pos".to_string(),
                ty: vec2,
            },
            StructField {
                name: "power".to_string(),
                ty: float,
            },
        ],
    });
    let material = shader.types.intern(Type::Interface {
        name: "Material".to_string(),
        packing: InterfacePacking::Std140,
        fields: vec![
            StructField {
                name: "diffuse".to_string(),
                ty: vec4,
            },
            StructField {
                name: "gloss".to_string(),
                ty: float,
            },
        ],
    });

    let mut tex = Variable::new("tex", sampler2d, VariableMode::Uniform);
    tex.flags = VariableFlags::new()
        .with(VariableFlags::EXPLICIT_BINDING)
        .with(VariableFlags::USED);
    tex.flags.binding = 2;
    let tex = declare(&mut shader, tex);
    let shadow_map = declare(
        &mut shader,
        Variable::new("shadow_map", shadow2d, VariableMode::Uniform),
    );

    let mut block = Variable::new("material", material, VariableMode::Uniform);
    block.interface_type = Some(material);
    declare(&mut shader, block);
    let mut diffuse = Variable::new("diffuse", vec4, VariableMode::Uniform);
    diffuse.interface_type = Some(material);
    let diffuse = declare(&mut shader, diffuse);

    let mut weights = Variable::new("weights", weights_ty, VariableMode::Auto);
    weights.flags = VariableFlags::new().with(VariableFlags::READ_ONLY);
    weights.flags.max_array_access = 2;
    weights.constant_value = Some(Constant {
        ty: weights_ty,
        value: ConstantValue::Array(vec![
            Constant::floats(float, &[0.25]),
            Constant::floats(float, &[0.5]),
            Constant::floats(float, &[0.25]),
        ]),
    });
    let weights = declare(&mut shader, weights);

    let mut sun = Variable::new("sun", light, VariableMode::Auto);
    sun.constant_initializer = Some(Constant {
        ty: light,
        value: ConstantValue::Struct(vec![
            Constant::floats(vec2, &[0.5, 1.0]),
            Constant::floats(float, &[3.0]),
        ]),
    });
    let sun = declare(&mut shader, sun);

    let mut uv = Variable::new("uv", vec2, VariableMode::ShaderIn);
    uv.flags = VariableFlags::new()
        .with(VariableFlags::CENTROID)
        .with(VariableFlags::EXPLICIT_LOCATION);
    uv.flags.set_interpolation(Interpolation::NoPerspective);
    uv.flags.location = 1;
    let uv = declare(&mut shader, uv);

    let mut light_state = Variable::new("light_state", vec4, VariableMode::Uniform);
    light_state.state_slots = vec![
        StateSlot {
            swizzle: 0x688,
            tokens: [6, 0, 1, 1, 0],
        },
        StateSlot {
            swizzle: 0x1A,
            tokens: [6, 1, -1, 3, 7],
        },
    ];
    let light_state = declare(&mut shader, light_state);

    let mut color = Variable::new("color", vec4, VariableMode::ShaderOut);
    color.flags = VariableFlags::new()
        .with(VariableFlags::EXPLICIT_INDEX)
        .with(VariableFlags::INVARIANT);
    color.flags.location = 0;
    color.flags.index = 1;
    let color = declare(&mut shader, color);

    let c = shader.declare_variable(Variable::new("c", vec4, VariableMode::Temporary));
    let depth = shader.declare_variable(Variable::new("depth", float, VariableMode::Auto));
    let i = shader.declare_variable(Variable::new("i", int, VariableMode::Auto));

    let lookup = |op, ty, sampler: VariableId, coordinate: Rvalue, lod| {
        Rvalue::Texture(Box::new(Texture {
            op,
            ty,
            sampler: Box::new(Rvalue::var(sampler)),
            coordinate: Some(Box::new(coordinate)),
            projector: None,
            shadow_comparator: None,
            offset: None,
            lod,
        }))
    };
    let float_const = |v: f32| Rvalue::Constant(Constant::floats(float, &[v]));
    let int_const = |v: i32| Rvalue::Constant(Constant::ints(int, &[v]));

    let biased = Texture {
        op: TextureOp::Txb,
        ty: vec4,
        sampler: Box::new(Rvalue::var(tex)),
        coordinate: Some(Box::new(Rvalue::var(uv))),
        projector: None,
        shadow_comparator: None,
        offset: Some(Box::new(Rvalue::Constant(Constant::ints(ivec2, &[1, -1])))),
        lod: LodInfo::Bias(Box::new(float_const(0.5))),
    };
    let shadowed = Rvalue::Texture(Box::new(Texture {
        op: TextureOp::Tex,
        ty: float,
        sampler: Box::new(Rvalue::var(shadow_map)),
        coordinate: Some(Box::new(Rvalue::var(uv))),
        projector: Some(Box::new(float_const(2.0))),
        shadow_comparator: Some(Box::new(float_const(0.75))),
        offset: None,
        lod: LodInfo::None,
    }));

    let main = shader.add_function("main");
    let mut sig = Signature::new(main, void);
    sig.is_defined = true;
    sig.body = vec![
        Instruction::Variable(c),
        Instruction::Variable(depth),
        Instruction::Variable(i),
        store(
            Rvalue::var(c),
            lookup(TextureOp::Tex, vec4, tex, Rvalue::var(uv), LodInfo::None),
        ),
        Instruction::Assignment(Assignment {
            lhs: Rvalue::var(c),
            rhs: Rvalue::Texture(Box::new(biased)),
            condition: Some(binary(
                bool_ty,
                ExprOp::Less,
                swizzle(Rvalue::var(uv), [0, 0, 0, 0], 1),
                float_const(0.5),
            )),
            write_mask: 0x3,
        }),
        store(
            Rvalue::var(c),
            lookup(
                TextureOp::Txl,
                vec4,
                tex,
                Rvalue::var(uv),
                LodInfo::Lod(Box::new(float_const(1.0))),
            ),
        ),
        store(
            Rvalue::var(c),
            lookup(
                TextureOp::Txd,
                vec4,
                tex,
                Rvalue::var(uv),
                LodInfo::Grad {
                    dpdx: Box::new(swizzle(Rvalue::var(uv), [1, 0, 0, 0], 2)),
                    dpdy: Box::new(Rvalue::Constant(Constant::floats(vec2, &[0.0, 0.125]))),
                },
            ),
        ),
        store(
            Rvalue::var(c),
            lookup(
                TextureOp::Txf,
                vec4,
                tex,
                Rvalue::Constant(Constant::ints(ivec2, &[4, 5])),
                LodInfo::SampleIndex(Box::new(int_const(0))),
            ),
        ),
        store(
            Rvalue::var(c),
            lookup(
                TextureOp::Tg4,
                vec4,
                tex,
                Rvalue::var(uv),
                LodInfo::Component(Box::new(int_const(1))),
            ),
        ),
        store(Rvalue::var(depth), shadowed),
        store(Rvalue::var(i), int_const(0)),
        Instruction::Loop(Loop {
            body: vec![Instruction::If(IfStmt {
                condition: binary(bool_ty, ExprOp::Less, Rvalue::var(i), int_const(3)),
                then_body: vec![
                    store(
                        Rvalue::var(c),
                        binary(
                            vec4,
                            ExprOp::Mul,
                            Rvalue::var(c),
                            Rvalue::DerefArray {
                                array: Box::new(Rvalue::var(weights)),
                                index: Box::new(Rvalue::var(i)),
                            },
                        ),
                    ),
                    store(
                        Rvalue::var(i),
                        binary(int, ExprOp::Add, Rvalue::var(i), int_const(1)),
                    ),
                    Instruction::LoopJump(LoopJumpMode::Continue),
                ],
                else_body: vec![Instruction::LoopJump(LoopJumpMode::Break)],
            })],
        }),
        Instruction::Assignment(Assignment {
            lhs: Rvalue::var(c),
            rhs: swizzle(
                Rvalue::DerefRecord {
                    record: Box::new(Rvalue::var(sun)),
                    field: "pos".to_string(),
                },
                [0, 1, 0, 0],
                2,
            ),
            condition: None,
            write_mask: 0x3,
        }),
        Instruction::Discard(Some(binary(
            bool_ty,
            ExprOp::Less,
            swizzle(Rvalue::var(c), [3, 0, 0, 0], 1),
            Rvalue::var(depth),
        ))),
        Instruction::If(IfStmt {
            condition: Rvalue::Constant(Constant::bools(bool_ty, &[false])),
            then_body: vec![Instruction::Discard(None)],
            else_body: Vec::new(),
        }),
        store(
            Rvalue::var(color),
            binary(
                vec4,
                ExprOp::Add,
                binary(
                    vec4,
                    ExprOp::Mul,
                    Rvalue::var(c),
                    swizzle(Rvalue::var(diffuse), [2, 1, 0, 3], 4),
                ),
                Rvalue::var(light_state),
            ),
        ),
        Instruction::Return(None),
    ];
    shader.add_signature(sig);
    shader.body.push(Instruction::Function(main));
    shader
}

/// A geometry shader emitting on two streams from inside a loop.
pub fn geometry_shader() -> Shader {
    let mut shader = Shader::new(ShaderStage::Geometry);
    let void = shader.types.intern(Type::Void);
    let vec4 = shader.types.intern(Type::vec(4));
    let mut out_pos = Variable::new("out_pos", vec4, VariableMode::ShaderOut);
    out_pos.flags.location = 0;
    let out_pos = declare(&mut shader, out_pos);

    let main = shader.add_function("main");
    let mut sig = Signature::new(main, void);
    sig.is_defined = true;
    sig.body = vec![
        Instruction::Loop(Loop {
            body: vec![
                store(
                    Rvalue::var(out_pos),
                    Rvalue::Constant(Constant::floats(vec4, &[0.0, 1.0, 0.0, 1.0])),
                ),
                Instruction::EmitVertex { stream: 0 },
                Instruction::EmitVertex { stream: 2 },
                Instruction::EndPrimitive { stream: 2 },
                Instruction::LoopJump(LoopJumpMode::Break),
            ],
        }),
        Instruction::EndPrimitive { stream: 0 },
    ];
    shader.add_signature(sig);
    shader.body.push(Instruction::Function(main));
    shader
}

/// Asserts that `back` is `original` field for field, up to renumbering of
/// arena and type ids. Variable sharing must match both ways: every
/// original variable maps to exactly one decoded variable and vice versa.
pub fn assert_same_shader(original: &Shader, back: &Shader) {
    assert_eq!(original.stage, back.stage);
    let mut matcher = Matcher {
        a: original,
        b: back,
        vars: HashMap::new(),
        vars_back: HashMap::new(),
        sigs: HashMap::new(),
    };
    matcher.list(&original.body, &back.body);
}

struct Matcher<'a> {
    a: &'a Shader,
    b: &'a Shader,
    vars: HashMap<VariableId, VariableId>,
    vars_back: HashMap<VariableId, VariableId>,
    sigs: HashMap<SignatureId, SignatureId>,
}

impl Matcher<'_> {
    fn ty(&self, ta: TypeId, tb: TypeId) {
        match (self.a.types.get(ta), self.b.types.get(tb)) {
            (Type::Array { element: ea, length: la }, Type::Array { element: eb, length: lb }) => {
                assert_eq!(la, lb);
                self.ty(*ea, *eb);
            }
            (Type::Struct { name: na, fields: fa }, Type::Struct { name: nb, fields: fb }) => {
                assert_eq!(na, nb);
                self.fields(fa, fb);
            }
            (
                Type::Interface {
                    name: na,
                    packing: pa,
                    fields: fa,
                },
                Type::Interface {
                    name: nb,
                    packing: pb,
                    fields: fb,
                },
            ) => {
                assert_eq!((na, pa), (nb, pb));
                self.fields(fa, fb);
            }
            (a, b) => assert_eq!(a, b),
        }
    }

    fn fields(&self, fa: &[StructField], fb: &[StructField]) {
        assert_eq!(fa.len(), fb.len());
        for (a, b) in fa.iter().zip(fb) {
            assert_eq!(a.name, b.name);
            self.ty(a.ty, b.ty);
        }
    }

    fn var(&mut self, va: VariableId, vb: VariableId) {
        if let Some(&mapped) = self.vars.get(&va) {
            assert_eq!(mapped, vb, "`{}` resolved to two variables", self.a.variables[va].name);
            return;
        }
        assert!(
            self.vars_back.insert(vb, va).is_none(),
            "two variables resolved to `{}`",
            self.b.variables[vb].name
        );
        self.vars.insert(va, vb);

        let (shader_a, shader_b) = (self.a, self.b);
        let (a, b) = (&shader_a.variables[va], &shader_b.variables[vb]);
        assert_eq!(a.name, b.name);
        assert_eq!(a.mode, b.mode, "mode of `{}`", a.name);
        assert_eq!(a.flags, b.flags, "flags of `{}`", a.name);
        assert_eq!(a.flags.bits(), b.flags.bits(), "flag bits of `{}`", a.name);
        assert_eq!(a.state_slots, b.state_slots, "state slots of `{}`", a.name);
        self.ty(a.ty, b.ty);
        for (ca, cb) in [
            (&a.constant_value, &b.constant_value),
            (&a.constant_initializer, &b.constant_initializer),
        ] {
            assert_eq!(ca.is_some(), cb.is_some(), "constants of `{}`", a.name);
            if let (Some(ca), Some(cb)) = (ca, cb) {
                self.constant(ca, cb);
            }
        }
        match (a.interface_type, b.interface_type) {
            (Some(ia), Some(ib)) => self.ty(ia, ib),
            (ia, ib) => assert_eq!(ia.is_some(), ib.is_some(), "interface of `{}`", a.name),
        }
    }

    fn constant(&self, ca: &Constant, cb: &Constant) {
        self.ty(ca.ty, cb.ty);
        match (&ca.value, &cb.value) {
            (ConstantValue::Components(a), ConstantValue::Components(b)) => assert_eq!(a, b),
            (ConstantValue::Array(a), ConstantValue::Array(b))
            | (ConstantValue::Struct(a), ConstantValue::Struct(b)) => {
                assert_eq!(a.len(), b.len());
                for (x, y) in a.iter().zip(b) {
                    self.constant(x, y);
                }
            }
            (a, b) => panic!("constant shapes differ: {a:?} vs {b:?}"),
        }
    }

    fn sig(&mut self, sa: SignatureId, sb: SignatureId) {
        if let Some(&mapped) = self.sigs.get(&sa) {
            assert_eq!(mapped, sb);
            return;
        }
        self.sigs.insert(sa, sb);
        let (shader_a, shader_b) = (self.a, self.b);
        let (a, b) = (&shader_a.signatures[sa], &shader_b.signatures[sb]);
        assert_eq!(
            shader_a.functions[a.function].name,
            shader_b.functions[b.function].name
        );
        assert_eq!((a.is_builtin, a.is_defined), (b.is_builtin, b.is_defined));
        self.ty(a.return_type, b.return_type);
        assert_eq!(a.parameters.len(), b.parameters.len());
        for (&pa, &pb) in a.parameters.iter().zip(&b.parameters) {
            self.var(pa, pb);
        }
        self.list(&a.body, &b.body);
    }

    fn list(&mut self, a: &[Instruction], b: &[Instruction]) {
        assert_eq!(a.len(), b.len(), "statement counts differ:\n{a:?}\n{b:?}");
        for (x, y) in a.iter().zip(b) {
            self.instruction(x, y);
        }
    }

    fn option(&mut self, a: Option<&Rvalue>, b: Option<&Rvalue>) {
        match (a, b) {
            (Some(a), Some(b)) => self.rvalue(a, b),
            (None, None) => {}
            (a, b) => panic!("optional operand differs: {a:?} vs {b:?}"),
        }
    }

    fn instruction(&mut self, a: &Instruction, b: &Instruction) {
        match (a, b) {
            (Instruction::Variable(va), Instruction::Variable(vb)) => self.var(*va, *vb),
            (Instruction::Assignment(x), Instruction::Assignment(y)) => {
                assert_eq!(x.write_mask, y.write_mask);
                self.rvalue(&x.lhs, &y.lhs);
                self.option(x.condition.as_ref(), y.condition.as_ref());
                self.rvalue(&x.rhs, &y.rhs);
            }
            (Instruction::Function(fa), Instruction::Function(fb)) => {
                let (shader_a, shader_b) = (self.a, self.b);
                let (fa, fb) = (&shader_a.functions[*fa], &shader_b.functions[*fb]);
                assert_eq!(fa.name, fb.name);
                assert_eq!(fa.signatures.len(), fb.signatures.len());
                for (&sa, &sb) in fa.signatures.iter().zip(&fb.signatures) {
                    self.sig(sa, sb);
                }
            }
            (Instruction::If(x), Instruction::If(y)) => {
                self.rvalue(&x.condition, &y.condition);
                self.list(&x.then_body, &y.then_body);
                self.list(&x.else_body, &y.else_body);
            }
            (Instruction::Loop(x), Instruction::Loop(y)) => self.list(&x.body, &y.body),
            (Instruction::LoopJump(x), Instruction::LoopJump(y)) => assert_eq!(x, y),
            (Instruction::Return(x), Instruction::Return(y))
            | (Instruction::Discard(x), Instruction::Discard(y)) => {
                self.option(x.as_ref(), y.as_ref())
            }
            (Instruction::Call(x), Instruction::Call(y)) => {
                self.sig(x.callee, y.callee);
                self.option(x.return_deref.as_ref(), y.return_deref.as_ref());
                assert_eq!(x.actual_parameters.len(), y.actual_parameters.len());
                for (p, q) in x.actual_parameters.iter().zip(&y.actual_parameters) {
                    self.rvalue(p, q);
                }
            }
            (Instruction::EmitVertex { stream: x }, Instruction::EmitVertex { stream: y })
            | (Instruction::EndPrimitive { stream: x }, Instruction::EndPrimitive { stream: y }) => {
                assert_eq!(x, y)
            }
            (a, b) => panic!("statements differ:\n{a:?}\n{b:?}"),
        }
    }

    fn rvalue(&mut self, a: &Rvalue, b: &Rvalue) {
        match (a, b) {
            (Rvalue::Constant(x), Rvalue::Constant(y)) => self.constant(x, y),
            (Rvalue::Expression(x), Rvalue::Expression(y)) => {
                assert_eq!(x.op, y.op);
                self.ty(x.ty, y.ty);
                assert_eq!(x.operands.len(), y.operands.len());
                for (p, q) in x.operands.iter().zip(&y.operands) {
                    self.rvalue(p, q);
                }
            }
            (Rvalue::Swizzle(x), Rvalue::Swizzle(y)) => {
                assert_eq!((x.components, x.count), (y.components, y.count));
                self.rvalue(&x.value, &y.value);
            }
            (Rvalue::Texture(x), Rvalue::Texture(y)) => {
                assert_eq!(x.op, y.op);
                self.ty(x.ty, y.ty);
                self.rvalue(&x.sampler, &y.sampler);
                self.option(x.coordinate.as_deref(), y.coordinate.as_deref());
                self.option(x.projector.as_deref(), y.projector.as_deref());
                self.option(
                    x.shadow_comparator.as_deref(),
                    y.shadow_comparator.as_deref(),
                );
                self.option(x.offset.as_deref(), y.offset.as_deref());
                assert_eq!(x.lod.kind(), y.lod.kind());
                let (lx, ly) = (x.lod.operands(), y.lod.operands());
                assert_eq!(lx.len(), ly.len());
                for (p, q) in lx.into_iter().zip(ly) {
                    self.rvalue(p, q);
                }
            }
            (Rvalue::DerefVariable(x), Rvalue::DerefVariable(y)) => self.var(*x, *y),
            (
                Rvalue::DerefArray { array: ax, index: ix },
                Rvalue::DerefArray { array: ay, index: iy },
            ) => {
                self.rvalue(ax, ay);
                self.rvalue(ix, iy);
            }
            (
                Rvalue::DerefRecord { record: rx, field: fx },
                Rvalue::DerefRecord { record: ry, field: fy },
            ) => {
                assert_eq!(fx, fy);
                self.rvalue(rx, ry);
            }
            (a, b) => panic!("rvalues differ:\n{a:?}\n{b:?}"),
        }
    }
}
