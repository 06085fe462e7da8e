//! The operator contract table.
//!
//! Each operator owns an ordered list of overload rules. A rule is a guard
//! over the operand base types plus a builder for the outcome; resolution
//! takes the first rule whose guard accepts. Order is load-bearing: the
//! rules for special operands (undefined, null, constant indices) sit above
//! the general ones.

use rustc_hash::FxHashMap;

use refjs_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use refjs_types::mutability::Mutability;
use refjs_types::predicate::{Pred, Term};
use refjs_types::rtype::{ArrayType, DictType, RType, Refined};

use crate::compat::assignable;
use crate::op::Op;

/// A proof obligation handed to the back end: the named contract holds only
/// if the predicate can be discharged at the use site.
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    pub contract: &'static str,
    pub pred: Pred,
}

/// The outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The refined type of the whole expression.
    pub result: Refined,
    /// Obligations that remain to be discharged.
    pub obligations: Vec<Obligation>,
    /// For iteration forms, the refined type of the loop binder.
    pub element: Option<Refined>,
}

impl Resolution {
    pub fn of(result: Refined) -> Self {
        Self {
            result,
            obligations: Vec::new(),
            element: None,
        }
    }

    pub fn with_obligation(mut self, contract: &'static str, pred: Pred) -> Self {
        self.obligations.push(Obligation { contract, pred });
        self
    }

    pub fn with_element(mut self, element: Refined) -> Self {
        self.element = Some(element);
        self
    }
}

pub(crate) enum RuleOutcome {
    Resolved(Resolution),
    /// The rule matched and statically rejects the expression. Every
    /// applicable diagnostic is carried, not just the first.
    Rejected(Vec<Diagnostic>),
}

pub(crate) struct Overload {
    pub name: &'static str,
    pub guard: Box<dyn Fn(&[Refined]) -> bool>,
    pub apply: Box<dyn Fn(&[Refined]) -> RuleOutcome>,
}

/// The table of operator contracts.
pub struct OperatorTable {
    rules: FxHashMap<Op, Vec<Overload>>,
    auto_downgrade_unique: bool,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::with_options(true)
    }

    /// `auto_downgrade_unique` controls whether [`OperatorTable::aliased`]
    /// silently demotes `UniqueMutable` on an aliasing event; when off, the
    /// front end is expected to demote explicitly.
    pub fn with_options(auto_downgrade_unique: bool) -> Self {
        let mut table = Self {
            rules: FxHashMap::default(),
            auto_downgrade_unique,
        };
        table.install();
        table
    }

    /// Resolve an operation against its operand types. On success the
    /// refined result is returned; on failure every applicable rejection is
    /// added to `diags` and `None` is returned.
    pub fn resolve(
        &self,
        op: Op,
        operands: &[Refined],
        diags: &mut DiagnosticCollection,
    ) -> Option<Resolution> {
        let rules = self.rules.get(&op)?;
        for rule in rules {
            if (rule.guard)(operands) {
                match (rule.apply)(operands) {
                    RuleOutcome::Resolved(resolution) => return Some(resolution),
                    RuleOutcome::Rejected(errors) => {
                        diags.extend_from_slice(&errors);
                        return None;
                    }
                }
            }
        }
        diags.add(
            Diagnostic::new(
                &messages::NO_OPERATOR_CONTRACT,
                &[op.symbol(), &describe_operands(operands)],
            )
            .with_contract(op.symbol()),
        );
        None
    }

    /// The names of the overloads registered for `op`, in trial order.
    pub fn overload_names(&self, op: Op) -> Vec<&'static str> {
        self.rules
            .get(&op)
            .map(|rules| rules.iter().map(|r| r.name).collect())
            .unwrap_or_default()
    }

    /// The type of a binding after an aliasing event. Unique containers
    /// lose their uniqueness (unless automatic demotion is disabled).
    pub fn aliased(&self, ty: &Refined) -> Refined {
        if !self.auto_downgrade_unique {
            return ty.clone();
        }
        Self::downgrade(ty)
    }

    /// Demote a `UniqueMutable` container type to `Mutable`.
    pub fn downgrade(ty: &Refined) -> Refined {
        let base = match &ty.base {
            RType::Array(a) => RType::Array(ArrayType {
                mutability: a.mutability.aliased(),
                // A length tracked through a unique reference is no longer
                // trustworthy once another writer can exist.
                known_len: if a.mutability == Mutability::UniqueMutable {
                    None
                } else {
                    a.known_len
                },
                elem: a.elem.clone(),
            }),
            RType::Dict(d) => RType::Dict(DictType {
                mutability: d.mutability.aliased(),
                fields: d.fields.clone(),
                index: d.index.clone(),
            }),
            other => other.clone(),
        };
        Refined::new(base, ty.pred.clone())
    }

    fn add<G, A>(&mut self, op: Op, name: &'static str, guard: G, apply: A)
    where
        G: Fn(&[Refined]) -> bool + 'static,
        A: Fn(&[Refined]) -> RuleOutcome + 'static,
    {
        self.rules.entry(op).or_default().push(Overload {
            name,
            guard: Box::new(guard),
            apply: Box::new(apply),
        });
    }

    fn install(&mut self) {
        self.install_comparisons();
        self.install_equality();
        self.install_arithmetic();
        self.install_logic();
        self.install_bitvector();
        self.install_observations();
        self.install_containers();
        self.install_control();
    }

    // --------------------------------------------------------------------
    // <, <=, >, >=
    // --------------------------------------------------------------------
    fn install_comparisons(&mut self) {
        for op in [Op::Lt, Op::LtEq, Op::Gt, Op::GtEq] {
            self.add(
                op,
                "relational comparison of numbers",
                |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
                move |_| boolean_iff(relational_pred(op)),
            );
            self.add(
                op,
                "relational comparison of like values",
                |ops| ops.len() == 2 && common_base(&ops[0].base, &ops[1].base).is_some(),
                |_| resolved(Refined::trivial(RType::Boolean)),
            );
        }
    }

    // --------------------------------------------------------------------
    // ===, !==
    // --------------------------------------------------------------------
    fn install_equality(&mut self) {
        self.add(
            Op::StrictEq,
            "strict equality across distinct tags",
            |ops| ops.len() == 2 && definitely_distinct(&ops[0].base, &ops[1].base),
            |_| boolean_iff(Pred::False),
        );
        self.add(
            Op::StrictEq,
            "strict equality",
            |ops| ops.len() == 2,
            |_| boolean_iff(Pred::Alias(Term::op(0), Term::op(1))),
        );
        self.add(
            Op::StrictNeq,
            "strict inequality across distinct tags",
            |ops| ops.len() == 2 && definitely_distinct(&ops[0].base, &ops[1].base),
            |_| boolean_iff(Pred::True),
        );
        self.add(
            Op::StrictNeq,
            "strict inequality",
            |ops| ops.len() == 2,
            |_| boolean_iff(Pred::not(Pred::Alias(Term::op(0), Term::op(1)))),
        );
    }

    // --------------------------------------------------------------------
    // +, -, *, /, %, unary +, unary -
    // --------------------------------------------------------------------
    fn install_arithmetic(&mut self) {
        self.add(
            Op::Add,
            "addition of numbers",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |ops| {
                let base = fold_numeric(&ops[0].base, &ops[1].base, |a, b| a + b);
                resolved(Refined::new(
                    base,
                    Pred::Eq(Term::v(), Term::add(Term::op(0), Term::op(1))),
                ))
            },
        );
        self.add(
            Op::Add,
            "addition of bit-vectors",
            |ops| ops.len() == 2 && is_bv(&ops[0].base) && is_bv(&ops[1].base),
            |_| resolved(Refined::trivial(RType::BitVec32)),
        );
        self.add(
            Op::Add,
            "addition of a number and a bit-vector",
            |ops| {
                ops.len() == 2
                    && bv_view(&ops[0].base)
                    && bv_view(&ops[1].base)
                    && (is_bv(&ops[0].base) != is_bv(&ops[1].base))
            },
            |_| resolved(Refined::trivial(RType::Number)),
        );
        self.add(
            Op::Add,
            "string concatenation",
            |ops| ops.len() == 2 && is_string(&ops[0].base) && is_string(&ops[1].base),
            |ops| {
                let base = match (str_lit(&ops[0].base), str_lit(&ops[1].base)) {
                    (Some(a), Some(b)) => RType::StringLit(format!("{a}{b}")),
                    _ => RType::String,
                };
                resolved(Refined::trivial(base))
            },
        );
        self.add(
            Op::Add,
            "string coercion",
            |ops| {
                ops.len() == 2
                    && ((is_string(&ops[0].base) && is_coercible(&ops[1].base))
                        || (is_coercible(&ops[0].base) && is_string(&ops[1].base)))
            },
            |_| resolved(Refined::trivial(RType::String)),
        );

        self.add(
            Op::Sub,
            "subtraction of numbers",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |ops| {
                let base = fold_numeric(&ops[0].base, &ops[1].base, |a, b| a - b);
                resolved(Refined::new(
                    base,
                    Pred::Eq(Term::v(), Term::sub(Term::op(0), Term::op(1))),
                ))
            },
        );
        self.add(
            Op::Sub,
            "subtraction of bit-vectors",
            |ops| ops.len() == 2 && is_bv(&ops[0].base) && is_bv(&ops[1].base),
            |_| resolved(Refined::trivial(RType::BitVec32)),
        );

        self.add(
            Op::Mul,
            "multiplication of numbers",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |ops| {
                let base = fold_numeric(&ops[0].base, &ops[1].base, |a, b| a * b);
                let zero = || Term::num(0.0);
                let pred = Pred::and(vec![
                    Pred::Eq(Term::v(), Term::mul(Term::op(0), Term::op(1))),
                    // Sign rules.
                    Pred::implies(
                        Pred::and(vec![
                            Pred::Lt(zero(), Term::op(0)),
                            Pred::Lt(zero(), Term::op(1)),
                        ]),
                        Pred::Lt(zero(), Term::v()),
                    ),
                    Pred::implies(
                        Pred::and(vec![
                            Pred::Lt(Term::op(0), zero()),
                            Pred::Lt(Term::op(1), zero()),
                        ]),
                        Pred::Lt(zero(), Term::v()),
                    ),
                    Pred::implies(
                        Pred::or(vec![
                            Pred::Eq(Term::op(0), zero()),
                            Pred::Eq(Term::op(1), zero()),
                        ]),
                        Pred::Eq(Term::v(), zero()),
                    ),
                ]);
                resolved(Refined::new(base, pred))
            },
        );

        self.add(
            Op::Div,
            "div: divisor must be nonzero",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |ops| {
                if num_lit(&ops[1].base) == Some(0.0) {
                    return rejected(vec![Diagnostic::new(&messages::DIVISION_BY_ZERO, &[])
                        .with_contract("div: divisor must be nonzero")]);
                }
                let base = match (num_lit(&ops[0].base), num_lit(&ops[1].base)) {
                    (Some(a), Some(b)) => RType::NumberLit(a / b),
                    _ => RType::Number,
                };
                let pred = Pred::and(vec![
                    // Bounded result for a positive dividend and a divisor
                    // beyond one.
                    Pred::implies(
                        Pred::and(vec![
                            Pred::Lt(Term::num(0.0), Term::op(0)),
                            Pred::Lt(Term::num(1.0), Term::op(1)),
                        ]),
                        Pred::and(vec![
                            Pred::Le(Term::num(0.0), Term::v()),
                            Pred::Lt(Term::v(), Term::op(0)),
                        ]),
                    ),
                    // Division by one is the identity.
                    Pred::implies(
                        Pred::Eq(Term::op(1), Term::num(1.0)),
                        Pred::Eq(Term::v(), Term::op(0)),
                    ),
                ]);
                RuleOutcome::Resolved(Resolution::of(Refined::new(base, pred)).with_obligation(
                    "div: divisor must be nonzero",
                    Pred::Ne(Term::op(1), Term::num(0.0)),
                ))
            },
        );

        self.add(
            Op::Mod,
            "remainder of numbers",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |_| resolved(Refined::trivial(RType::Number)),
        );

        self.add(
            Op::PrefixPlus,
            "unary plus",
            |ops| ops.len() == 1 && is_number(&ops[0].base),
            |_| {
                resolved(Refined::new(
                    RType::Number,
                    Pred::Alias(Term::v(), Term::op(0)),
                ))
            },
        );
        self.add(
            Op::PrefixMinus,
            "unary minus",
            |ops| ops.len() == 1 && is_number(&ops[0].base),
            |ops| {
                let base = match num_lit(&ops[0].base) {
                    Some(n) => RType::NumberLit(-n),
                    None => RType::Number,
                };
                resolved(Refined::new(
                    base,
                    Pred::Eq(Term::v(), Term::sub(Term::num(0.0), Term::op(0))),
                ))
            },
        );
    }

    // --------------------------------------------------------------------
    // &&, ||, !
    // --------------------------------------------------------------------
    fn install_logic(&mut self) {
        self.add(
            Op::LogicalAnd,
            "conjunction with an undefined left operand",
            |ops| ops.len() == 2 && ops[0].base == RType::Undefined,
            |_| resolved(Refined::trivial(RType::Undefined)),
        );
        self.add(
            Op::LogicalAnd,
            "conjunction with a null left operand",
            |ops| ops.len() == 2 && ops[0].base == RType::Null,
            |_| resolved(Refined::trivial(RType::Null)),
        );
        self.add(
            Op::LogicalAnd,
            "conjunction of like values",
            |ops| ops.len() == 2 && common_base(&ops[0].base, &ops[1].base).is_some(),
            |ops| {
                let base = common_base(&ops[0].base, &ops[1].base).unwrap();
                resolved(Refined::new(
                    base,
                    Pred::ite(
                        Pred::Prop(Term::op(0)),
                        Pred::Alias(Term::v(), Term::op(1)),
                        Pred::Alias(Term::v(), Term::op(0)),
                    ),
                ))
            },
        );
        self.add(
            Op::LogicalAnd,
            "conjunction",
            |ops| ops.len() == 2,
            |_| {
                resolved(Refined::new(
                    RType::Top,
                    Pred::iff(
                        Pred::prop_v(),
                        Pred::and(vec![Pred::Prop(Term::op(0)), Pred::Prop(Term::op(1))]),
                    ),
                ))
            },
        );

        self.add(
            Op::LogicalOr,
            "disjunction with an undefined left operand",
            |ops| ops.len() == 2 && ops[0].base == RType::Undefined,
            |ops| {
                resolved(Refined::new(
                    ops[1].base.clone(),
                    Pred::Alias(Term::v(), Term::op(1)),
                ))
            },
        );
        self.add(
            Op::LogicalOr,
            "disjunction with a null left operand",
            |ops| ops.len() == 2 && ops[0].base == RType::Null,
            |ops| {
                resolved(Refined::new(
                    ops[1].base.clone(),
                    Pred::Alias(Term::v(), Term::op(1)),
                ))
            },
        );
        self.add(
            Op::LogicalOr,
            "disjunction of like values",
            |ops| ops.len() == 2 && common_base(&ops[0].base, &ops[1].base).is_some(),
            |ops| {
                let base = common_base(&ops[0].base, &ops[1].base).unwrap();
                resolved(Refined::new(
                    base,
                    Pred::ite(
                        Pred::Prop(Term::op(0)),
                        Pred::Alias(Term::v(), Term::op(0)),
                        Pred::Alias(Term::v(), Term::op(1)),
                    ),
                ))
            },
        );
        self.add(
            Op::LogicalOr,
            "disjunction",
            |ops| ops.len() == 2,
            |_| {
                resolved(Refined::new(
                    RType::Top,
                    Pred::iff(
                        Pred::prop_v(),
                        Pred::or(vec![Pred::Prop(Term::op(0)), Pred::Prop(Term::op(1))]),
                    ),
                ))
            },
        );

        self.add(
            Op::LogicalNot,
            "negation",
            |ops| ops.len() == 1,
            |_| boolean_iff(Pred::not(Pred::Prop(Term::op(0)))),
        );
    }

    // --------------------------------------------------------------------
    // &, |, ^, ~, <<, >>, >>>
    // --------------------------------------------------------------------
    fn install_bitvector(&mut self) {
        self.add(
            Op::BitAnd,
            "bitwise conjunction",
            |ops| ops.len() == 2 && bv_view(&ops[0].base) && bv_view(&ops[1].base),
            |_| {
                resolved(Refined::new(
                    RType::BitVec32,
                    Pred::Eq(Term::v(), Term::bv_and(Term::op(0), Term::op(1))),
                ))
            },
        );
        self.add(
            Op::BitOr,
            "bitwise disjunction",
            |ops| ops.len() == 2 && bv_view(&ops[0].base) && bv_view(&ops[1].base),
            |_| {
                resolved(Refined::new(
                    RType::BitVec32,
                    Pred::Eq(Term::v(), Term::bv_or(Term::op(0), Term::op(1))),
                ))
            },
        );
        self.add(
            Op::BitXor,
            "bitwise exclusive disjunction",
            |ops| ops.len() == 2 && bv_view(&ops[0].base) && bv_view(&ops[1].base),
            |_| resolved(Refined::trivial(RType::BitVec32)),
        );
        self.add(
            Op::BitNot,
            "bitwise complement",
            |ops| ops.len() == 1 && bv_view(&ops[0].base),
            |_| {
                // ~x is -(x + 1) on the numeric view.
                resolved(Refined::new(
                    RType::Number,
                    Pred::Eq(
                        Term::v(),
                        Term::sub(Term::num(0.0), Term::add(Term::op(0), Term::num(1.0))),
                    ),
                ))
            },
        );
        self.add(
            Op::LeftShift,
            "left shift",
            |ops| ops.len() == 2 && bv_view(&ops[0].base) && bv_view(&ops[1].base),
            |_| resolved(Refined::trivial(RType::Number)),
        );
        self.add(
            Op::RightShift,
            "shift: operands must be non-negative",
            |ops| ops.len() == 2 && is_number(&ops[0].base) && is_number(&ops[1].base),
            |_| {
                // Sign-propagating shift of a non-negative value stays
                // non-negative.
                RuleOutcome::Resolved(
                    Resolution::of(Refined::new(RType::Number, Pred::nonneg(Term::v())))
                        .with_obligation(
                            "shift: operands must be non-negative",
                            Pred::and(vec![
                                Pred::nonneg(Term::op(0)),
                                Pred::nonneg(Term::op(1)),
                            ]),
                        ),
                )
            },
        );
        self.add(
            Op::UnsignedRightShift,
            "unsigned right shift",
            |ops| ops.len() == 2 && bv_view(&ops[0].base) && bv_view(&ops[1].base),
            |_| resolved(Refined::new(RType::Number, Pred::nonneg(Term::v()))),
        );
    }

    // --------------------------------------------------------------------
    // typeof, instanceof, in, truthy, falsy
    // --------------------------------------------------------------------
    fn install_observations(&mut self) {
        self.add(
            Op::Typeof,
            "typeof",
            |ops| ops.len() == 1,
            |ops| {
                let base = match ops[0].base.runtime_tag() {
                    Some(tag) => RType::StringLit(tag.to_owned()),
                    None => RType::String,
                };
                resolved(Refined::new(
                    base,
                    Pred::Eq(Term::v(), Term::ttag(Term::op(0))),
                ))
            },
        );
        self.add(
            Op::Instanceof,
            "instanceof a named class",
            |ops| ops.len() == 2 && str_lit(&ops[1].base).is_some(),
            |ops| {
                let name = str_lit(&ops[1].base).unwrap().to_owned();
                boolean_iff(Pred::ExtendsClass(Term::op(0), name))
            },
        );
        self.add(
            Op::In,
            "index membership in an immutable array",
            |ops| {
                ops.len() == 2
                    && is_number(&ops[0].base)
                    && immutable_array(&ops[1].base).is_some()
            },
            |_| boolean_iff(Pred::in_bounds(Term::op(0), Term::op(1))),
        );
        self.add(
            Op::In,
            "property membership",
            |ops| ops.len() == 2 && is_string(&ops[0].base) && is_objecty(&ops[1].base),
            |_| boolean_iff(Pred::HasProperty(Term::op(0), Term::op(1))),
        );
        self.add(
            Op::IsNan,
            "isNaN",
            |ops| {
                ops.len() == 1
                    && ops[0]
                        .base
                        .members()
                        .iter()
                        .all(|m| is_number(m) || *m == RType::Undefined)
            },
            // The argument fails to be a number exactly when the check holds.
            |_| {
                boolean_iff(Pred::not(Pred::has_tag(Term::op(0), "number")))
            },
        );
        self.add(
            Op::Truthy,
            "truthiness of a bit-vector",
            |ops| ops.len() == 1 && is_bv(&ops[0].base),
            |_| boolean_iff(Pred::Ne(Term::op(0), Term::Bv(0x0000_0000))),
        );
        self.add(
            Op::Truthy,
            "truthiness",
            |ops| ops.len() == 1,
            |_| boolean_iff(Pred::Prop(Term::op(0))),
        );
        self.add(
            Op::Falsy,
            "falsiness",
            |ops| ops.len() == 1,
            |_| boolean_iff(Pred::not(Pred::Prop(Term::op(0)))),
        );
    }

    // --------------------------------------------------------------------
    // Array literals, bracket reference, bracket assignment, set-prop,
    // for-in key extraction
    // --------------------------------------------------------------------
    fn install_containers(&mut self) {
        self.add(
            Op::ArrayLiteral,
            "array literal",
            |_| true,
            |ops| {
                let elem = ops
                    .iter()
                    .map(|o| o.base.widen_literal())
                    .fold(RType::Never, RType::union2);
                let n = ops.len() as u64;
                resolved(Refined::new(
                    RType::Array(ArrayType {
                        mutability: Mutability::UniqueMutable,
                        elem: Box::new(elem),
                        known_len: Some(n),
                    }),
                    Pred::Eq(Term::len(Term::v()), Term::num(n as f64)),
                ))
            },
        );

        self.install_bracket_ref();
        self.install_bracket_assign();
        self.install_set_prop();

        self.add(
            Op::ForInKeys,
            "for-in over an immutable array",
            |ops| ops.len() == 1 && immutable_array(&ops[0].base).is_some(),
            |ops| {
                let arr = immutable_array(&ops[0].base).unwrap();
                RuleOutcome::Resolved(
                    Resolution::of(Refined::new(
                        RType::Array(ArrayType {
                            mutability: Mutability::Immutable,
                            elem: Box::new(RType::Number),
                            known_len: arr.known_len,
                        }),
                        Pred::Eq(Term::len(Term::v()), Term::len(Term::op(0))),
                    ))
                    .with_element(Refined::new(
                        RType::Number,
                        Pred::in_bounds(Term::v(), Term::op(0)),
                    )),
                )
            },
        );
        self.add(
            Op::ForInKeys,
            "for-in over an immutable object",
            |ops| {
                ops.len() == 1
                    && match &ops[0].base {
                        RType::Dict(d) => d.mutability == Mutability::Immutable,
                        RType::Instance(_) => true,
                        _ => false,
                    }
            },
            |_| {
                RuleOutcome::Resolved(
                    Resolution::of(Refined::trivial(RType::array(
                        Mutability::Immutable,
                        RType::String,
                    )))
                    .with_element(Refined::new(
                        RType::String,
                        Pred::and(vec![
                            Pred::HasProperty(Term::v(), Term::op(0)),
                            Pred::EnumProp(Term::v(), Term::op(0)),
                        ]),
                    )),
                )
            },
        );
    }

    fn install_bracket_ref(&mut self) {
        self.add(
            Op::BracketRef,
            "bracket-ref on an immutable array with a constant index",
            |ops| {
                ops.len() == 2
                    && immutable_array(&ops[0].base)
                        .map(|a| a.known_len.is_some())
                        .unwrap_or(false)
                    && num_lit(&ops[1].base).is_some()
            },
            |ops| {
                let arr = immutable_array(&ops[0].base).unwrap();
                let len = arr.known_len.unwrap();
                let idx = num_lit(&ops[1].base).unwrap();
                if idx < 0.0 || idx.fract() != 0.0 || idx as u64 >= len {
                    return rejected(vec![Diagnostic::new(
                        &messages::OUT_OF_BOUNDS,
                        &[&format!("{idx}"), &len.to_string()],
                    )
                    .with_contract("bracket-ref: index within immutable bounds")]);
                }
                resolved(Refined::trivial((*arr.elem).clone()))
            },
        );
        self.add(
            Op::BracketRef,
            "bracket-ref: index within immutable bounds",
            |ops| {
                ops.len() == 2
                    && immutable_array(&ops[0].base).is_some()
                    && is_number(&ops[1].base)
            },
            |ops| {
                let arr = immutable_array(&ops[0].base).unwrap();
                RuleOutcome::Resolved(
                    Resolution::of(Refined::trivial((*arr.elem).clone())).with_obligation(
                        "bracket-ref: index within immutable bounds",
                        Pred::in_bounds(Term::op(1), Term::op(0)),
                    ),
                )
            },
        );
        self.add(
            Op::BracketRef,
            "bracket-ref on an array",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && (is_number(&ops[1].base) || number_or_undefined(&ops[1].base))
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                resolved(Refined::trivial(RType::union2(
                    (*arr.elem).clone(),
                    RType::Undefined,
                )))
            },
        );
        self.add(
            Op::BracketRef,
            "bracket-ref with an undefined index",
            |ops| {
                ops.len() == 2
                    && as_array(&ops[0].base).is_some()
                    && ops[1].base == RType::Undefined
            },
            |_| resolved(Refined::trivial(RType::Undefined)),
        );
        self.add(
            Op::BracketRef,
            "bracket-ref of a known field",
            |ops| {
                ops.len() == 2 && as_dict(&ops[0].base).is_some() && str_lit(&ops[1].base).is_some()
            },
            |ops| {
                let dict = as_dict(&ops[0].base).unwrap();
                let name = str_lit(&ops[1].base).unwrap();
                match dict.fields.get(name) {
                    Some(field) if !field.optional => resolved(Refined::trivial(field.ty.clone())),
                    Some(field) => resolved(Refined::new(
                        RType::union2(field.ty.clone(), RType::Undefined),
                        presence_pred(Term::str(name)),
                    )),
                    None => match &dict.index {
                        Some(index_ty) => resolved(Refined::new(
                            RType::union2((**index_ty).clone(), RType::Undefined),
                            presence_pred(Term::str(name)),
                        )),
                        None => rejected(vec![Diagnostic::new(
                            &messages::PROPERTY_NOT_PRESENT,
                            &[name, &ops[0].base.describe()],
                        )
                        .with_contract("bracket-ref of a known field")]),
                    },
                }
            },
        );
        self.add(
            Op::BracketRef,
            "bracket-ref with a computed key",
            |ops| {
                ops.len() == 2 && as_dict(&ops[0].base).is_some() && is_string(&ops[1].base)
            },
            |ops| {
                let dict = as_dict(&ops[0].base).unwrap();
                match &dict.index {
                    Some(index_ty) => resolved(Refined::new(
                        RType::union2((**index_ty).clone(), RType::Undefined),
                        presence_pred(Term::op(1)),
                    )),
                    // A closed dict with no fields at all says nothing about
                    // what a computed key could produce.
                    None if dict.fields.is_empty() => {
                        resolved(Refined::trivial(RType::Top))
                    }
                    None => {
                        let all = dict
                            .fields
                            .values()
                            .map(|f| f.ty.clone())
                            .fold(RType::Undefined, RType::union2);
                        resolved(Refined::trivial(all))
                    }
                }
            },
        );
    }

    fn install_bracket_assign(&mut self) {
        self.add(
            Op::BracketAssign,
            "bracket-assign on an array",
            |ops| {
                ops.len() == 3 && as_array(&ops[0].base).is_some() && is_number(&ops[1].base)
            },
            |ops| {
                let arr = as_array(&ops[0].base).unwrap();
                let mut errors = Vec::new();
                if !arr.mutability.can_write() {
                    errors.push(
                        Diagnostic::new(
                            &messages::WRITE_TO_READ_ONLY,
                            &[arr.mutability.as_str()],
                        )
                        .with_contract("bracket-assign on an array"),
                    );
                }
                if let (Some(len), Some(idx)) = (arr.known_len, num_lit(&ops[1].base)) {
                    if arr.mutability == Mutability::Immutable
                        && (idx < 0.0 || idx.fract() != 0.0 || idx as u64 >= len)
                    {
                        errors.push(
                            Diagnostic::new(
                                &messages::OUT_OF_BOUNDS,
                                &[&format!("{idx}"), &len.to_string()],
                            )
                            .with_contract("bracket-assign on an array"),
                        );
                    }
                }
                if !assignable(&ops[2].base, &arr.elem) {
                    errors.push(
                        Diagnostic::new(
                            &messages::ARGUMENT_NOT_ASSIGNABLE,
                            &[&ops[2].base.describe(), &arr.elem.describe()],
                        )
                        .with_contract("bracket-assign on an array"),
                    );
                }
                if errors.is_empty() {
                    resolved(Refined::trivial(RType::Undefined))
                } else {
                    rejected(errors)
                }
            },
        );
        self.add(
            Op::BracketAssign,
            "bracket-assign of a known field",
            |ops| {
                ops.len() == 3 && as_dict(&ops[0].base).is_some() && str_lit(&ops[1].base).is_some()
            },
            |ops| {
                let dict = as_dict(&ops[0].base).unwrap();
                let name = str_lit(&ops[1].base).unwrap();
                match write_field(dict, name, &ops[2].base, "bracket-assign of a known field") {
                    Ok(()) => resolved(Refined::trivial(RType::Undefined)),
                    Err(errors) => rejected(errors),
                }
            },
        );
    }

    fn install_set_prop(&mut self) {
        self.add(
            Op::SetProp,
            "set-prop with a unique receiver",
            |ops| {
                ops.len() == 3
                    && as_dict(&ops[0].base)
                        .map(|d| d.mutability == Mutability::UniqueMutable)
                        .unwrap_or(false)
                    && str_lit(&ops[1].base).is_some()
            },
            // A strong update: the field takes on the assigned type, so the
            // expression has exactly that type.
            |ops| resolved(Refined::trivial(ops[2].base.clone())),
        );
        self.add(
            Op::SetProp,
            "set-prop through a mutable field",
            |ops| {
                ops.len() == 3
                    && as_dict(&ops[0].base).is_some()
                    && str_lit(&ops[1].base).is_some()
            },
            |ops| {
                let dict = as_dict(&ops[0].base).unwrap();
                let name = str_lit(&ops[1].base).unwrap();
                match write_field(dict, name, &ops[2].base, "set-prop through a mutable field") {
                    Ok(()) => resolved(Refined::trivial(ops[2].base.clone())),
                    Err(errors) => rejected(errors),
                }
            },
        );
    }

    // --------------------------------------------------------------------
    // Conditionals and casts
    // --------------------------------------------------------------------
    fn install_control(&mut self) {
        self.add(
            Op::Conditional,
            "conditional",
            |ops| ops.len() == 3,
            |ops| {
                let base = RType::union2(ops[1].base.clone(), ops[2].base.clone());
                resolved(Refined::new(
                    base,
                    Pred::ite(
                        Pred::Prop(Term::op(0)),
                        Pred::Alias(Term::v(), Term::op(1)),
                        Pred::Alias(Term::v(), Term::op(2)),
                    ),
                ))
            },
        );
        self.add(
            Op::Cast,
            "cast",
            |ops| ops.len() == 1,
            |ops| {
                resolved(Refined::new(
                    ops[0].base.clone(),
                    Pred::Alias(Term::v(), Term::op(0)),
                ))
            },
        );
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------
// Guard helpers
// ------------------------------------------------------------------------

fn is_number(t: &RType) -> bool {
    matches!(t, RType::Number | RType::NumberLit(_))
}

fn is_string(t: &RType) -> bool {
    matches!(t, RType::String | RType::StringLit(_))
}

fn is_bv(t: &RType) -> bool {
    matches!(t, RType::BitVec32)
}

fn bv_view(t: &RType) -> bool {
    is_number(t) || is_bv(t)
}

fn is_coercible(t: &RType) -> bool {
    is_number(t) || matches!(t, RType::Boolean)
}

fn is_objecty(t: &RType) -> bool {
    matches!(t, RType::Dict(_) | RType::Instance(_))
}

fn as_array(t: &RType) -> Option<&ArrayType> {
    match t {
        RType::Array(a) => Some(a),
        _ => None,
    }
}

fn immutable_array(t: &RType) -> Option<&ArrayType> {
    as_array(t).filter(|a| a.mutability == Mutability::Immutable)
}

fn as_dict(t: &RType) -> Option<&DictType> {
    match t {
        RType::Dict(d) => Some(d),
        _ => None,
    }
}

fn num_lit(t: &RType) -> Option<f64> {
    match t {
        RType::NumberLit(n) => Some(*n),
        _ => None,
    }
}

fn str_lit(t: &RType) -> Option<&str> {
    match t {
        RType::StringLit(s) => Some(s),
        _ => None,
    }
}

fn number_or_undefined(t: &RType) -> bool {
    match t {
        RType::Union(members) => {
            members.iter().all(|m| is_number(m) || *m == RType::Undefined)
        }
        _ => false,
    }
}

/// The shared carrier of two base types, widening literal singletons.
fn common_base(a: &RType, b: &RType) -> Option<RType> {
    if a == b {
        return Some(a.clone());
    }
    let (wa, wb) = (a.widen_literal(), b.widen_literal());
    if wa == wb {
        Some(wa)
    } else {
        None
    }
}

/// Both tags are known and differ, so strict equality is decided statically.
fn definitely_distinct(a: &RType, b: &RType) -> bool {
    match (a.runtime_tag(), b.runtime_tag()) {
        (Some(ta), Some(tb)) => ta != tb,
        _ => false,
    }
}

fn describe_operands(ops: &[Refined]) -> String {
    let parts: Vec<String> = ops.iter().map(|o| format!("'{}'", o.base.describe())).collect();
    parts.join(" and ")
}

// ------------------------------------------------------------------------
// Outcome builders
// ------------------------------------------------------------------------

fn resolved(result: Refined) -> RuleOutcome {
    RuleOutcome::Resolved(Resolution::of(result))
}

fn rejected(errors: Vec<Diagnostic>) -> RuleOutcome {
    RuleOutcome::Rejected(errors)
}

/// `{ boolean | Prop v <=> p }`.
fn boolean_iff(p: Pred) -> RuleOutcome {
    resolved(Refined::new(
        RType::Boolean,
        Pred::iff(Pred::prop_v(), p),
    ))
}

/// Constant-fold two numeric operands, keeping the symbolic refinement to
/// the side.
fn fold_numeric(a: &RType, b: &RType, f: impl Fn(f64, f64) -> f64) -> RType {
    match (num_lit(a), num_lit(b)) {
        (Some(x), Some(y)) => RType::NumberLit(f(x, y)),
        _ => RType::Number,
    }
}

fn relational_pred(op: Op) -> Pred {
    match op {
        Op::Lt => Pred::Lt(Term::op(0), Term::op(1)),
        Op::LtEq => Pred::Le(Term::op(0), Term::op(1)),
        Op::Gt => Pred::Lt(Term::op(1), Term::op(0)),
        Op::GtEq => Pred::Le(Term::op(1), Term::op(0)),
        _ => unreachable!("not a relational operator"),
    }
}

/// `hasProperty(name, x0) <=> ttag v != "undefined"`: the read produces a
/// present value exactly when the key resolves.
fn presence_pred(name: Term) -> Pred {
    Pred::iff(
        Pred::HasProperty(name, Term::op(0)),
        Pred::Ne(Term::ttag(Term::v()), Term::str("undefined")),
    )
}

/// Shared write-capability check for keyed writes into a dict.
fn write_field(
    dict: &DictType,
    name: &str,
    value: &RType,
    contract: &'static str,
) -> Result<(), Vec<Diagnostic>> {
    let mut errors = Vec::new();
    if dict.mutability == Mutability::UniqueMutable {
        return Ok(());
    }
    match dict.fields.get(name) {
        Some(field) => {
            if !field.mutability.can_write() {
                errors.push(
                    Diagnostic::new(&messages::WRITE_TO_READ_ONLY, &[field.mutability.as_str()])
                        .with_contract(contract),
                );
            }
            if !assignable(value, &field.ty) {
                errors.push(
                    Diagnostic::new(
                        &messages::ARGUMENT_NOT_ASSIGNABLE,
                        &[&value.describe(), &field.ty.describe()],
                    )
                    .with_contract(contract),
                );
            }
        }
        None => match &dict.index {
            Some(index_ty) if dict.mutability.can_write() => {
                if !assignable(value, index_ty) {
                    errors.push(
                        Diagnostic::new(
                            &messages::ARGUMENT_NOT_ASSIGNABLE,
                            &[&value.describe(), &index_ty.describe()],
                        )
                        .with_contract(contract),
                    );
                }
            }
            Some(_) => errors.push(
                Diagnostic::new(&messages::WRITE_TO_READ_ONLY, &[dict.mutability.as_str()])
                    .with_contract(contract),
            ),
            None => errors.push(
                Diagnostic::new(
                    &messages::PROPERTY_NOT_PRESENT,
                    &[name, &RType::Dict(dict.clone()).describe()],
                )
                .with_contract(contract),
            ),
        },
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
