//! Read/write analysis of hand-written method bodies.
//!
//! Only member chains rooted at `self` are tracked. A chain is a run of
//! field accesses and argument-less method calls (`self.customer().name()`
//! is `[customer, name]`). The analysis is syntactic and conservative: an
//! unrecognised construct is simply not recorded.

use rxgen_core::{AccessSet, MemberPath};
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{BinOp, Block, Expr, Member, Token, UnOp};

/// Methods that mutate their receiver when called on a member.
const MUTATORS: &[&str] = &[
    "push",
    "push_back",
    "push_front",
    "insert",
    "remove",
    "clear",
    "extend",
    "retain",
    "set",
    "replace",
    "update",
    "pop",
    "truncate",
    "sort",
    "swap",
];

/// Summarize the member reads, writes and `self` calls of a block.
pub fn analyze_block(block: &Block) -> AccessSet {
    let mut visitor = AccessVisitor::default();
    visitor.visit_block(block);
    visitor.access
}

#[derive(Default)]
struct AccessVisitor {
    access: AccessSet,
}

impl AccessVisitor {
    fn read(&mut self, chain: Vec<String>) {
        if !chain.is_empty() {
            self.access.reads.insert(MemberPath::new(chain));
        }
    }

    fn write(&mut self, chain: Vec<String>) {
        if !chain.is_empty() {
            self.access.writes.insert(MemberPath::new(chain));
        }
    }

    fn assignment(&mut self, target: &Expr, value: &Expr) {
        match member_chain(target) {
            Some(chain) if !chain.is_empty() => self.write(chain),
            _ => self.visit_expr(target),
        }
        self.visit_expr(value);
    }
}

impl<'ast> Visit<'ast> for AccessVisitor {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Assign(assign) => self.assignment(&assign.left, &assign.right),
            Expr::Binary(binary) if is_compound_assignment(&binary.op) => {
                self.assignment(&binary.left, &binary.right)
            }
            Expr::Field(_) => match member_chain(expr) {
                Some(chain) => self.read(chain),
                None => visit::visit_expr(self, expr),
            },
            _ => visit::visit_expr(self, expr),
        }
    }

    fn visit_expr_method_call(&mut self, call: &'ast syn::ExprMethodCall) {
        match member_chain(&call.receiver) {
            Some(mut chain) => {
                let method = call.method.to_string();
                let on_self = chain.is_empty();
                if on_self {
                    self.access.calls.insert(method.clone());
                }
                let writes = (method.starts_with("set_") && call.args.len() == 1)
                    || (!on_self && MUTATORS.contains(&method.as_str()));
                chain.push(method);
                if writes {
                    self.write(chain);
                } else {
                    self.read(chain);
                }
            }
            None => self.visit_expr(&call.receiver),
        }
        for arg in &call.args {
            self.visit_expr(arg);
        }
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        // Formatting and collection macros take expression lists.
        if let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
    }
}

fn is_compound_assignment(op: &BinOp) -> bool {
    matches!(
        op,
        BinOp::AddAssign(_)
            | BinOp::SubAssign(_)
            | BinOp::MulAssign(_)
            | BinOp::DivAssign(_)
            | BinOp::RemAssign(_)
            | BinOp::BitXorAssign(_)
            | BinOp::BitAndAssign(_)
            | BinOp::BitOrAssign(_)
            | BinOp::ShlAssign(_)
            | BinOp::ShrAssign(_)
    )
}

/// Member chain of an expression rooted at `self`, or `None`.
fn member_chain(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Path(path) if path.path.is_ident("self") => Some(Vec::new()),
        Expr::Field(field) => {
            let mut chain = member_chain(&field.base)?;
            chain.push(match &field.member {
                Member::Named(ident) => ident.to_string(),
                Member::Unnamed(index) => index.index.to_string(),
            });
            Some(chain)
        }
        Expr::MethodCall(call) if call.args.is_empty() => {
            let mut chain = member_chain(&call.receiver)?;
            chain.push(call.method.to_string());
            Some(chain)
        }
        Expr::Paren(inner) => member_chain(&inner.expr),
        Expr::Reference(inner) => member_chain(&inner.expr),
        Expr::Try(inner) => member_chain(&inner.expr),
        Expr::Await(inner) => member_chain(&inner.base),
        Expr::Unary(unary) if matches!(unary.op, UnOp::Deref(_)) => member_chain(&unary.expr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn paths(set: &std::collections::BTreeSet<MemberPath>) -> Vec<String> {
        set.iter().map(|p| p.0.join(".")).collect()
    }

    #[test]
    fn test_setter_and_getter_calls() {
        let block: Block = parse_quote!({
            let total = self.total() * 2.0;
            self.set_status("saved".to_string());
            self.persist(total);
        });
        let access = analyze_block(&block);

        assert!(access.written_members().contains("status"));
        assert!(access.direct_reads().contains("total"));
        assert!(access.calls.contains("persist"));
        assert!(access.calls.contains("set_status"));
    }

    #[test]
    fn test_reads_through_reference() {
        let block: Block = parse_quote!({
            if self.customer().name().is_empty() {
                return;
            }
            println!("{}", self.customer.email());
        });
        let access = analyze_block(&block);
        let through = access.reads_through("customer");

        assert!(through.contains("name"));
        assert!(through.contains("email"));
    }

    #[test]
    fn test_assignment_and_mutators() {
        let block: Block = parse_quote!({
            self.count += 1;
            self.lines.push(line);
            *self.total.write() = 3.0;
            self.customer().set_name(self.label());
        });
        let access = analyze_block(&block);
        let written = access.written_members();

        assert!(written.contains("count"));
        assert!(written.contains("lines"));
        assert!(written.contains("total"));
        assert!(paths(&access.writes).contains(&"customer.set_name".to_string()));
        assert!(access.direct_reads().contains("label"));
    }

    #[test]
    fn test_closures_are_visited() {
        let block: Block = parse_quote!({
            let items: Vec<_> = self.lines().iter().map(|l| l.amount * self.rate()).collect();
        });
        let access = analyze_block(&block);
        assert!(access.direct_reads().contains("rate"));
        assert!(access.direct_reads().contains("lines"));
    }
}
