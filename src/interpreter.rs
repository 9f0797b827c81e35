//! Script execution engine
//!
//! Script is a Forth-like stack machine evaluating a predicate: no loops,
//! two stacks, and a conditional-execution mask. An input script and the
//! output script it spends are joined by a code separator and evaluated as
//! one program; the run succeeds when the final stack carries a true value.

use crate::bignum::ScriptNum;
use crate::constants::*;
use crate::error::{Result, ScriptError};
use crate::keystore::KeyStore;
use crate::script::{Opcode, Script};
use crate::sighash::{check_sig, signature_hash};
use crate::solver;
use crate::types::{ByteString, Transaction};

/// Boolean view of a stack value: true iff the number it encodes is nonzero
/// (so trailing zero padding and negative zero are still false).
pub fn cast_to_bool(value: &[u8]) -> bool {
    !ScriptNum::from_bytes(value).is_zero()
}

fn bool_value(b: bool) -> ByteString {
    if b {
        vec![1]
    } else {
        Vec::new()
    }
}

fn pop(stack: &mut Vec<ByteString>) -> Result<ByteString> {
    stack
        .pop()
        .ok_or_else(|| ScriptError::StackUnderflow("pop from empty stack".to_string()))
}

fn need(stack: &[ByteString], depth: usize, op: Opcode) -> Result<()> {
    if stack.len() < depth {
        return Err(ScriptError::StackUnderflow(format!(
            "opcode {:#04x} needs {} stack items, has {}",
            op.to_byte(),
            depth,
            stack.len()
        )));
    }
    Ok(())
}

/// Index from the top: `top(stack, 1)` is the topmost item.
fn top(stack: &[ByteString], depth: usize) -> &ByteString {
    &stack[stack.len() - depth]
}

fn top_mut(stack: &mut [ByteString], depth: usize) -> &mut ByteString {
    let len = stack.len();
    &mut stack[len - depth]
}

/// Evaluate a script against the transaction context used by its signature
/// checks. Returns the final truth of the run; structural failures are
/// `Err` and collapse to `false` at the verification boundary.
pub fn eval_script(
    script: &Script,
    tx_to: &Transaction,
    n_in: usize,
    hash_type: u8,
    flags: u32,
) -> Result<bool> {
    let stack = eval(script, tx_to, n_in, hash_type, flags)?;
    Ok(match stack.last() {
        Some(top) => cast_to_bool(top),
        None => false,
    })
}

/// As [`eval_script`], also handing back the final primary stack.
pub fn eval_script_with_stack(
    script: &Script,
    tx_to: &Transaction,
    n_in: usize,
    hash_type: u8,
    flags: u32,
) -> Result<(bool, Vec<ByteString>)> {
    let stack = eval(script, tx_to, n_in, hash_type, flags)?;
    let result = match stack.last() {
        Some(top) => cast_to_bool(top),
        None => false,
    };
    Ok((result, stack))
}

fn eval(
    script: &Script,
    tx_to: &Transaction,
    n_in: usize,
    hash_type: u8,
    flags: u32,
) -> Result<Vec<ByteString>> {
    if script.len() > MAX_SCRIPT_SIZE {
        return Err(ScriptError::ScriptExecution("script too large".to_string()));
    }

    let end = script.len();
    let mut pc = 0usize;
    let mut code_hash_begin = 0usize;
    let mut stack: Vec<ByteString> = Vec::new();
    let mut altstack: Vec<ByteString> = Vec::new();
    let mut exec_stack: Vec<bool> = Vec::new();
    let mut op_count = 0usize;

    while pc < end {
        let exec = !exec_stack.contains(&false);

        let (opcode, payload) = script.get_op(&mut pc)?;

        if exec && opcode.is_push() {
            stack.push(payload);
        } else if exec || opcode.is_conditional() {
            op_count += 1;
            if op_count > MAX_SCRIPT_OPS {
                return Err(ScriptError::ScriptExecution("operation limit exceeded".to_string()));
            }

            match opcode {
                //
                // Push value
                //
                Opcode::Op1Negate
                | Opcode::Op1
                | Opcode::Op2
                | Opcode::Op3
                | Opcode::Op4
                | Opcode::Op5
                | Opcode::Op6
                | Opcode::Op7
                | Opcode::Op8
                | Opcode::Op9
                | Opcode::Op10
                | Opcode::Op11
                | Opcode::Op12
                | Opcode::Op13
                | Opcode::Op14
                | Opcode::Op15
                | Opcode::Op16 => {
                    // ( -- value)
                    let n = opcode.to_byte() as i64 - (Opcode::Op1.to_byte() as i64 - 1);
                    stack.push(ScriptNum::from(n).to_bytes());
                }

                //
                // Control
                //
                Opcode::OpNop => {}

                Opcode::OpVer => {
                    if flags & SCRIPT_REJECT_VER != 0 {
                        return Err(ScriptError::DisabledOpcode(opcode.to_byte()));
                    }
                    stack.push(ScriptNum::from(PROTOCOL_VERSION).to_bytes());
                }

                Opcode::OpIf | Opcode::OpNotIf | Opcode::OpVerIf | Opcode::OpVerNotIf => {
                    // <expression> if [statements] [else [statements]] endif
                    let versioned =
                        matches!(opcode, Opcode::OpVerIf | Opcode::OpVerNotIf);
                    if versioned && flags & SCRIPT_REJECT_VER != 0 {
                        return Err(ScriptError::DisabledOpcode(opcode.to_byte()));
                    }
                    let mut value = false;
                    if exec {
                        need(&stack, 1, opcode)?;
                        let vch = pop(&mut stack)?;
                        value = if versioned {
                            ScriptNum::from(PROTOCOL_VERSION)
                                .cmp_value(&ScriptNum::from_bytes(&vch))
                                .is_ge()
                        } else {
                            cast_to_bool(&vch)
                        };
                        if matches!(opcode, Opcode::OpNotIf | Opcode::OpVerNotIf) {
                            value = !value;
                        }
                    }
                    exec_stack.push(value);
                }

                Opcode::OpElse => {
                    match exec_stack.last_mut() {
                        Some(frame) => *frame = !*frame,
                        None => return Err(ScriptError::UnbalancedConditional),
                    }
                }

                Opcode::OpEndIf => {
                    if exec_stack.pop().is_none() {
                        return Err(ScriptError::UnbalancedConditional);
                    }
                }

                Opcode::OpVerify => {
                    // (true -- ) or (false -- false) and stop
                    need(&stack, 1, opcode)?;
                    if cast_to_bool(top(&stack, 1)) {
                        stack.pop();
                    } else {
                        pc = end;
                    }
                }

                Opcode::OpReturn => {
                    pc = end;
                }

                //
                // Stack ops
                //
                Opcode::OpToAltStack => {
                    need(&stack, 1, opcode)?;
                    altstack.push(pop(&mut stack)?);
                }

                Opcode::OpFromAltStack => {
                    let item = altstack.pop().ok_or_else(|| {
                        ScriptError::StackUnderflow("alt stack is empty".to_string())
                    })?;
                    stack.push(item);
                }

                Opcode::Op2Drop => {
                    // (x1 x2 -- )
                    need(&stack, 2, opcode)?;
                    stack.pop();
                    stack.pop();
                }

                Opcode::Op2Dup => {
                    // (x1 x2 -- x1 x2 x1 x2)
                    need(&stack, 2, opcode)?;
                    let vch1 = top(&stack, 2).clone();
                    let vch2 = top(&stack, 1).clone();
                    stack.push(vch1);
                    stack.push(vch2);
                }

                Opcode::Op3Dup => {
                    // (x1 x2 x3 -- x1 x2 x3 x1 x2 x3)
                    need(&stack, 3, opcode)?;
                    let vch1 = top(&stack, 3).clone();
                    let vch2 = top(&stack, 2).clone();
                    let vch3 = top(&stack, 1).clone();
                    stack.push(vch1);
                    stack.push(vch2);
                    stack.push(vch3);
                }

                Opcode::Op2Over => {
                    // (x1 x2 x3 x4 -- x1 x2 x3 x4 x1 x2)
                    need(&stack, 4, opcode)?;
                    let vch1 = top(&stack, 4).clone();
                    let vch2 = top(&stack, 3).clone();
                    stack.push(vch1);
                    stack.push(vch2);
                }

                Opcode::Op2Rot => {
                    // (x1 x2 x3 x4 x5 x6 -- x3 x4 x5 x6 x1 x2)
                    need(&stack, 6, opcode)?;
                    let drain_from = stack.len() - 6;
                    let mut pair: Vec<ByteString> =
                        stack.drain(drain_from..drain_from + 2).collect();
                    stack.append(&mut pair);
                }

                Opcode::Op2Swap => {
                    // (x1 x2 x3 x4 -- x3 x4 x1 x2)
                    need(&stack, 4, opcode)?;
                    let len = stack.len();
                    stack.swap(len - 4, len - 2);
                    stack.swap(len - 3, len - 1);
                }

                Opcode::OpIfDup => {
                    // (x -- 0 | x x)
                    need(&stack, 1, opcode)?;
                    let vch = top(&stack, 1).clone();
                    if cast_to_bool(&vch) {
                        stack.push(vch);
                    }
                }

                Opcode::OpDepth => {
                    // ( -- stacksize)
                    stack.push(ScriptNum::from(stack.len()).to_bytes());
                }

                Opcode::OpDrop => {
                    // (x -- )
                    need(&stack, 1, opcode)?;
                    stack.pop();
                }

                Opcode::OpDup => {
                    // (x -- x x)
                    need(&stack, 1, opcode)?;
                    let vch = top(&stack, 1).clone();
                    stack.push(vch);
                }

                Opcode::OpNip => {
                    // (x1 x2 -- x2)
                    need(&stack, 2, opcode)?;
                    let len = stack.len();
                    stack.remove(len - 2);
                }

                Opcode::OpOver => {
                    // (x1 x2 -- x1 x2 x1)
                    need(&stack, 2, opcode)?;
                    let vch = top(&stack, 2).clone();
                    stack.push(vch);
                }

                Opcode::OpPick | Opcode::OpRoll => {
                    // (xn ... x2 x1 x0 n -- xn ... x2 x1 x0 xn)
                    // (xn ... x2 x1 x0 n -- ... x2 x1 x0 xn)
                    need(&stack, 2, opcode)?;
                    let n = ScriptNum::from_bytes(&pop(&mut stack)?).to_int();
                    if n < 0 || n as usize >= stack.len() {
                        return Err(ScriptError::StackUnderflow(format!(
                            "pick/roll depth {} out of range",
                            n
                        )));
                    }
                    let n = n as usize;
                    let idx = stack.len() - n - 1;
                    let vch = if opcode == Opcode::OpRoll {
                        stack.remove(idx)
                    } else {
                        stack[idx].clone()
                    };
                    stack.push(vch);
                }

                Opcode::OpRot => {
                    // (x1 x2 x3 -- x2 x3 x1)
                    need(&stack, 3, opcode)?;
                    let len = stack.len();
                    stack.swap(len - 3, len - 2);
                    stack.swap(len - 2, len - 1);
                }

                Opcode::OpSwap => {
                    // (x1 x2 -- x2 x1)
                    need(&stack, 2, opcode)?;
                    let len = stack.len();
                    stack.swap(len - 2, len - 1);
                }

                Opcode::OpTuck => {
                    // (x1 x2 -- x2 x1 x2)
                    need(&stack, 2, opcode)?;
                    let vch = top(&stack, 1).clone();
                    let len = stack.len();
                    stack.insert(len - 2, vch);
                }

                //
                // Splice ops
                //
                Opcode::OpCat => {
                    // (x1 x2 -- out)
                    need(&stack, 2, opcode)?;
                    let vch2 = pop(&mut stack)?;
                    top_mut(&mut stack, 1).extend_from_slice(&vch2);
                }

                Opcode::OpSubstr => {
                    // (in begin size -- out)
                    need(&stack, 3, opcode)?;
                    let size = ScriptNum::from_bytes(&pop(&mut stack)?).to_int() as i64;
                    let begin = ScriptNum::from_bytes(&pop(&mut stack)?).to_int() as i64;
                    let end_at = begin + size;
                    if begin < 0 || end_at < begin {
                        return Err(ScriptError::ArithmeticDomain(
                            "substr bounds out of range".to_string(),
                        ));
                    }
                    let vch = top_mut(&mut stack, 1);
                    let begin = (begin as usize).min(vch.len());
                    let end_at = (end_at as usize).min(vch.len());
                    vch.truncate(end_at);
                    vch.drain(..begin);
                }

                Opcode::OpLeft | Opcode::OpRight => {
                    // (in size -- out)
                    need(&stack, 2, opcode)?;
                    let size = ScriptNum::from_bytes(&pop(&mut stack)?).to_int();
                    if size < 0 {
                        return Err(ScriptError::ArithmeticDomain(
                            "negative slice size".to_string(),
                        ));
                    }
                    let vch = top_mut(&mut stack, 1);
                    let size = (size as usize).min(vch.len());
                    if opcode == Opcode::OpLeft {
                        vch.truncate(size);
                    } else {
                        vch.drain(..vch.len() - size);
                    }
                }

                Opcode::OpSize => {
                    // (in -- in size)
                    need(&stack, 1, opcode)?;
                    let size = top(&stack, 1).len();
                    stack.push(ScriptNum::from(size).to_bytes());
                }

                //
                // Bitwise logic
                //
                Opcode::OpInvert => {
                    // (in -- out)
                    need(&stack, 1, opcode)?;
                    for byte in top_mut(&mut stack, 1).iter_mut() {
                        *byte = !*byte;
                    }
                }

                Opcode::OpAnd | Opcode::OpOr | Opcode::OpXor => {
                    // (x1 x2 -- out), shorter operand zero-extended
                    need(&stack, 2, opcode)?;
                    let mut vch2 = pop(&mut stack)?;
                    let vch1 = top_mut(&mut stack, 1);
                    let width = vch1.len().max(vch2.len());
                    vch1.resize(width, 0);
                    vch2.resize(width, 0);
                    for (a, b) in vch1.iter_mut().zip(vch2.iter()) {
                        match opcode {
                            Opcode::OpAnd => *a &= b,
                            Opcode::OpOr => *a |= b,
                            _ => *a ^= b,
                        }
                    }
                }

                Opcode::OpEqual | Opcode::OpEqualVerify => {
                    // (x1 x2 -- bool), byte-identical comparison
                    need(&stack, 2, opcode)?;
                    let vch2 = pop(&mut stack)?;
                    let vch1 = pop(&mut stack)?;
                    let equal = vch1 == vch2;
                    stack.push(bool_value(equal));
                    if opcode == Opcode::OpEqualVerify {
                        if equal {
                            stack.pop();
                        } else {
                            pc = end;
                        }
                    }
                }

                //
                // Numeric
                //
                Opcode::Op1Add
                | Opcode::Op1Sub
                | Opcode::Op2Mul
                | Opcode::Op2Div
                | Opcode::OpNegate
                | Opcode::OpAbs
                | Opcode::OpNot
                | Opcode::Op0NotEqual => {
                    // (in -- out)
                    need(&stack, 1, opcode)?;
                    let bn = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let one = ScriptNum::from(1i64);
                    let result = match opcode {
                        Opcode::Op1Add => bn + one,
                        Opcode::Op1Sub => bn - one,
                        Opcode::Op2Mul => bn.shl(&one)?,
                        Opcode::Op2Div => bn.shr(&one)?,
                        Opcode::OpNegate => -bn,
                        Opcode::OpAbs => bn.abs(),
                        Opcode::OpNot => ScriptNum::from(bn.is_zero()),
                        _ => ScriptNum::from(!bn.is_zero()),
                    };
                    stack.push(result.to_bytes());
                }

                Opcode::OpAdd
                | Opcode::OpSub
                | Opcode::OpMul
                | Opcode::OpDiv
                | Opcode::OpMod
                | Opcode::OpLShift
                | Opcode::OpRShift
                | Opcode::OpBoolAnd
                | Opcode::OpBoolOr
                | Opcode::OpNumEqual
                | Opcode::OpNumEqualVerify
                | Opcode::OpNumNotEqual
                | Opcode::OpLessThan
                | Opcode::OpGreaterThan
                | Opcode::OpLessThanOrEqual
                | Opcode::OpGreaterThanOrEqual
                | Opcode::OpMin
                | Opcode::OpMax => {
                    // (x1 x2 -- out), numeric comparison ignores padding
                    need(&stack, 2, opcode)?;
                    let bn2 = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let bn1 = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let ord = bn1.cmp_value(&bn2);
                    let result = match opcode {
                        Opcode::OpAdd => bn1 + bn2,
                        Opcode::OpSub => bn1 - bn2,
                        Opcode::OpMul => bn1.mul(&bn2),
                        Opcode::OpDiv => bn1.div(&bn2)?,
                        Opcode::OpMod => bn1.rem(&bn2)?,
                        Opcode::OpLShift => bn1.shl(&bn2)?,
                        Opcode::OpRShift => bn1.shr(&bn2)?,
                        Opcode::OpBoolAnd => {
                            ScriptNum::from(!bn1.is_zero() && !bn2.is_zero())
                        }
                        Opcode::OpBoolOr => {
                            ScriptNum::from(!bn1.is_zero() || !bn2.is_zero())
                        }
                        Opcode::OpNumEqual | Opcode::OpNumEqualVerify => {
                            ScriptNum::from(ord.is_eq())
                        }
                        Opcode::OpNumNotEqual => ScriptNum::from(ord.is_ne()),
                        Opcode::OpLessThan => ScriptNum::from(ord.is_lt()),
                        Opcode::OpGreaterThan => ScriptNum::from(ord.is_gt()),
                        Opcode::OpLessThanOrEqual => ScriptNum::from(ord.is_le()),
                        Opcode::OpGreaterThanOrEqual => ScriptNum::from(ord.is_ge()),
                        Opcode::OpMin => bn1.min(bn2),
                        _ => bn1.max(bn2),
                    };
                    stack.push(result.to_bytes());

                    if opcode == Opcode::OpNumEqualVerify {
                        if cast_to_bool(top(&stack, 1)) {
                            stack.pop();
                        } else {
                            pc = end;
                        }
                    }
                }

                Opcode::OpWithin => {
                    // (x min max -- out), min <= x < max
                    need(&stack, 3, opcode)?;
                    let bn3 = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let bn2 = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let bn1 = ScriptNum::from_bytes(&pop(&mut stack)?);
                    let within = bn2.cmp_value(&bn1).is_le() && bn1.cmp_value(&bn3).is_lt();
                    stack.push(bool_value(within));
                }

                //
                // Crypto
                //
                Opcode::OpRipemd160
                | Opcode::OpSha1
                | Opcode::OpSha256
                | Opcode::OpHash160
                | Opcode::OpHash256 => {
                    // (in -- hash)
                    need(&stack, 1, opcode)?;
                    let vch = pop(&mut stack)?;
                    let digest: ByteString = match opcode {
                        Opcode::OpRipemd160 => crate::hash::ripemd160(&vch).to_vec(),
                        Opcode::OpSha1 => crate::hash::sha1(&vch).to_vec(),
                        Opcode::OpSha256 => crate::hash::sha256(&vch).to_vec(),
                        Opcode::OpHash160 => crate::hash::hash160(&vch).to_vec(),
                        _ => crate::hash::sha256d(&vch).to_vec(),
                    };
                    stack.push(digest);
                }

                Opcode::OpCodeSeparator => {
                    // Hash starts after the code separator
                    code_hash_begin = pc;
                }

                Opcode::OpCheckSig | Opcode::OpCheckSigVerify => {
                    // (sig pubkey -- bool)
                    need(&stack, 2, opcode)?;
                    let sig = top(&stack, 2).clone();
                    let pubkey = top(&stack, 1).clone();

                    // Subset of script starting at the most recent separator;
                    // a signature cannot sign itself, so drop it from the code.
                    let mut sub =
                        Script::from_bytes(script.as_bytes()[code_hash_begin..].to_vec());
                    let mut sig_push = Script::new();
                    sig_push.push_data(&sig);
                    sub.find_and_delete(&sig_push);

                    let success = check_sig(&sig, &pubkey, &sub, tx_to, n_in, hash_type);

                    stack.pop();
                    stack.pop();
                    stack.push(bool_value(success));
                    if opcode == Opcode::OpCheckSigVerify {
                        if success {
                            stack.pop();
                        } else {
                            pc = end;
                        }
                    }
                }

                Opcode::OpCheckMultiSig | Opcode::OpCheckMultiSigVerify => {
                    // (sig_1 ... sig_m m pubkey_1 ... pubkey_n n -- bool)
                    need(&stack, 1, opcode)?;
                    let n_keys = ScriptNum::from_bytes(top(&stack, 1)).to_int();
                    if n_keys < 0 {
                        return Err(ScriptError::ArithmeticDomain(
                            "negative key count".to_string(),
                        ));
                    }
                    let n_keys = n_keys as usize;
                    let mut depth = 2 + n_keys;
                    need(&stack, depth, opcode)?;

                    let n_sigs = ScriptNum::from_bytes(top(&stack, depth)).to_int();
                    if n_sigs < 0 || n_sigs as usize > n_keys {
                        return Err(ScriptError::ArithmeticDomain(
                            "bad signature count".to_string(),
                        ));
                    }
                    let n_sigs = n_sigs as usize;
                    let first_sig = depth + 1;
                    depth += 1 + n_sigs;
                    // One extra item beyond the counted layout is consumed.
                    need(&stack, depth, opcode)?;

                    let mut sub =
                        Script::from_bytes(script.as_bytes()[code_hash_begin..].to_vec());
                    for s in 0..n_sigs {
                        let mut sig_push = Script::new();
                        sig_push.push_data(top(&stack, first_sig + s));
                        sub.find_and_delete(&sig_push);
                    }

                    let mut success = true;
                    let mut isig = first_sig;
                    let mut ikey = 2;
                    let mut sigs_left = n_sigs;
                    let mut keys_left = n_keys;
                    while success && sigs_left > 0 {
                        let sig = top(&stack, isig);
                        let pubkey = top(&stack, ikey);
                        if check_sig(sig, pubkey, &sub, tx_to, n_in, hash_type) {
                            isig += 1;
                            sigs_left -= 1;
                        }
                        ikey += 1;
                        keys_left -= 1;

                        // More signatures than keys left can never succeed
                        if sigs_left > keys_left {
                            success = false;
                        }
                    }

                    for _ in 0..depth {
                        stack.pop();
                    }
                    stack.push(bool_value(success));
                    if opcode == Opcode::OpCheckMultiSigVerify {
                        if success {
                            stack.pop();
                        } else {
                            pc = end;
                        }
                    }
                }

                Opcode::OpPubKey | Opcode::OpPubKeyHash | Opcode::OpUnknown(_) => {
                    return Err(ScriptError::DisabledOpcode(opcode.to_byte()));
                }

                // Pushes were handled before dispatch
                Opcode::Op0
                | Opcode::OpPushBytes(_)
                | Opcode::OpPushData1
                | Opcode::OpPushData2
                | Opcode::OpPushData4 => unreachable!("push opcodes never reach dispatch"),
            }
        }

        if stack.len() + altstack.len() > MAX_STACK_SIZE {
            return Err(ScriptError::ScriptExecution("stack overflow".to_string()));
        }
    }

    if !exec_stack.is_empty() {
        return Err(ScriptError::UnbalancedConditional);
    }
    Ok(stack)
}

/// Verify that input `n_in` of `tx_to` correctly spends its referenced
/// output of `tx_from`. Every failure collapses to `false`.
pub fn verify_signature(
    tx_from: &Transaction,
    tx_to: &Transaction,
    n_in: usize,
    hash_type: u8,
    flags: u32,
) -> bool {
    if n_in >= tx_to.inputs.len() {
        return false;
    }
    let txin = &tx_to.inputs[n_in];
    if txin.prevout.index as usize >= tx_from.outputs.len() {
        return false;
    }
    if txin.prevout.hash != tx_from.hash() {
        return false;
    }
    let txout = &tx_from.outputs[txin.prevout.index as usize];

    // The separator pins codeHashBegin past the witness-carrying prefix.
    let mut joined = Script::from_bytes(txin.script_sig.clone());
    joined.push_opcode(Opcode::OpCodeSeparator);
    let joined = joined.concat(&Script::from_bytes(txout.script_pubkey.clone()));

    eval_script(&joined, tx_to, n_in, hash_type, flags).unwrap_or(false)
}

/// Compile and install the scriptSig spending output
/// `tx_to.inputs[n_in].prevout` of `tx_from`, then check the result.
pub fn sign_signature(
    tx_from: &Transaction,
    tx_to: &mut Transaction,
    n_in: usize,
    hash_type: u8,
    keystore: &dyn KeyStore,
) -> Result<()> {
    if n_in >= tx_to.inputs.len() {
        return Err(ScriptError::TransactionValidation("input index out of range".to_string()));
    }
    let prev_index = tx_to.inputs[n_in].prevout.index as usize;
    if prev_index >= tx_from.outputs.len() {
        return Err(ScriptError::TransactionValidation("prevout index out of range".to_string()));
    }
    let script_pubkey = Script::from_bytes(tx_from.outputs[prev_index].script_pubkey.clone());

    // The signature is left out of its own hash; checksig drops it the same way.
    let digest = signature_hash(&script_pubkey, tx_to, n_in, hash_type);
    let script_sig = solver::solve(&script_pubkey, Some(&digest), hash_type, keystore)?;
    tx_to.inputs[n_in].script_sig = script_sig.into_bytes();

    // Test the solution before handing it back
    let mut joined = Script::from_bytes(tx_to.inputs[n_in].script_sig.clone());
    joined.push_opcode(Opcode::OpCodeSeparator);
    let joined = joined.concat(&script_pubkey);
    if !eval_script(&joined, tx_to, n_in, 0, 0)? {
        return Err(ScriptError::SignatureVerifyFailed);
    }
    Ok(())
}
