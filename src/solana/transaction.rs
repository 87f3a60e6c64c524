use super::{Hash, PublicKey, Signature};

/// placeholder of a signature not provided yet
const EMPTY_SIGNATURE: Signature = Signature::new([0; 64]);

/// set on the first byte of a versioned message
const VERSION_PREFIX: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction fee payer required")]
    MissingFeePayer,
    #[error("Transaction recent blockhash required")]
    MissingRecentBlockhash,
    #[error("Too many signatures ({got}), the message has {signers} signers")]
    TooManySignatures { got: usize, signers: usize },
    #[error("`{0}' is not a signer of this transaction")]
    UnknownSigner(PublicKey),
    #[error("Too many accounts ({0}) referenced by the transaction")]
    TooManyAccounts(usize),
    #[error("Length {0} does not fit a compact-u16")]
    LengthOverflow(usize),
    #[error("Versioned messages are not supported (version {0})")]
    UnsupportedVersion(u8),
    #[error("Invalid message header")]
    InvalidHeader,
    #[error("Account index {0} out of bounds")]
    InvalidAccountIndex(u8),
    #[error("Unexpected end of input, needed {needed} more bytes")]
    Truncated { needed: usize },
    #[error("Invalid compact length encoding")]
    InvalidCompactLength,
    #[error("{0} unexpected bytes after the message")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountMeta {
    pub pubkey: PublicKey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction as built by the application, the program's input is
/// opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: PublicKey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction whose accounts are indices in [`Message::account_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// The legacy message, the part of a transaction the signers sign.
///
/// ```text
/// header (3 bytes)
/// compact-u16 key count | account keys (32 bytes each)
/// recent blockhash (32 bytes)
/// compact-u16 instruction count | instructions
/// ```
///
/// The keys are ordered writable signers, readonly signers, writable
/// non-signers then readonly non-signers. The fee payer is the first key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<PublicKey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    pub fn compile(
        fee_payer: PublicKey,
        recent_blockhash: Hash,
        instructions: &[Instruction],
    ) -> Result<Self, TransactionError> {
        let mut metas = vec![AccountMeta::new(fee_payer, true)];
        for instruction in instructions {
            let program = AccountMeta::new_readonly(instruction.program_id, false);
            for meta in instruction.accounts.iter().chain(std::iter::once(&program)) {
                match metas.iter_mut().find(|known| known.pubkey == meta.pubkey) {
                    Some(known) => {
                        known.is_signer |= meta.is_signer;
                        known.is_writable |= meta.is_writable;
                    }
                    None => metas.push(*meta),
                }
            }
        }
        // stable, the fee payer stays first
        metas.sort_by_key(|meta| (!meta.is_signer, !meta.is_writable));
        if metas.len() > usize::from(u8::MAX) + 1 {
            return Err(TransactionError::TooManyAccounts(metas.len()));
        }

        let count = |role: fn(&AccountMeta) -> bool| {
            u8::try_from(metas.iter().filter(|meta| role(meta)).count())
                .map_err(|_| TransactionError::TooManyAccounts(metas.len()))
        };
        let header = MessageHeader {
            num_required_signatures: count(|meta| meta.is_signer)?,
            num_readonly_signed_accounts: count(|meta| meta.is_signer && !meta.is_writable)?,
            num_readonly_unsigned_accounts: count(|meta| !meta.is_signer && !meta.is_writable)?,
        };

        let account_keys: Vec<PublicKey> = metas.iter().map(|meta| meta.pubkey).collect();
        let index_of = |key: &PublicKey| {
            account_keys
                .iter()
                .position(|known| known == key)
                .and_then(|index| u8::try_from(index).ok())
                .ok_or(TransactionError::TooManyAccounts(account_keys.len()))
        };

        let instructions = instructions
            .iter()
            .map(|instruction| -> Result<CompiledInstruction, TransactionError> {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&instruction.program_id)?,
                    accounts: instruction
                        .accounts
                        .iter()
                        .map(|meta| index_of(&meta.pubkey))
                        .collect::<Result<_, _>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    /// the keys expected to sign, the fee payer first
    pub fn signers(&self) -> &[PublicKey] {
        let count = usize::from(self.header.num_required_signatures).min(self.account_keys.len());
        &self.account_keys[..count]
    }

    pub fn fee_payer(&self) -> Option<PublicKey> {
        self.signers().first().copied()
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < usize::from(self.header.num_required_signatures)
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let signed = usize::from(self.header.num_required_signatures);
        if index < signed {
            index < signed.saturating_sub(usize::from(self.header.num_readonly_signed_accounts))
        } else {
            index
                < self
                    .account_keys
                    .len()
                    .saturating_sub(usize::from(self.header.num_readonly_unsigned_accounts))
        }
    }

    /// the instructions with their accounts resolved
    pub fn decompile(&self) -> Result<Vec<Instruction>, TransactionError> {
        let key = |index: u8| {
            self.account_keys
                .get(usize::from(index))
                .copied()
                .ok_or(TransactionError::InvalidAccountIndex(index))
        };

        self.instructions
            .iter()
            .map(|instruction| -> Result<Instruction, TransactionError> {
                Ok(Instruction {
                    program_id: key(instruction.program_id_index)?,
                    accounts: instruction
                        .accounts
                        .iter()
                        .map(|index| -> Result<AccountMeta, TransactionError> {
                            Ok(AccountMeta {
                                pubkey: key(*index)?,
                                is_signer: self.is_signer(usize::from(*index)),
                                is_writable: self.is_writable(usize::from(*index)),
                            })
                        })
                        .collect::<Result<_, _>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let header = &self.header;
        let mut bytes = vec![
            header.num_required_signatures,
            header.num_readonly_signed_accounts,
            header.num_readonly_unsigned_accounts,
        ];

        encode_compact_len(&mut bytes, self.account_keys.len())?;
        for key in &self.account_keys {
            bytes.extend_from_slice(key.as_ref());
        }
        bytes.extend_from_slice(self.recent_blockhash.as_ref());

        encode_compact_len(&mut bytes, self.instructions.len())?;
        for instruction in &self.instructions {
            bytes.push(instruction.program_id_index);
            encode_compact_len(&mut bytes, instruction.accounts.len())?;
            bytes.extend_from_slice(&instruction.accounts);
            encode_compact_len(&mut bytes, instruction.data.len())?;
            bytes.extend_from_slice(&instruction.data);
        }

        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (header, rest) = split(bytes, 3)?;
        if header[0] & VERSION_PREFIX != 0 {
            return Err(TransactionError::UnsupportedVersion(
                header[0] & !VERSION_PREFIX,
            ));
        }
        let header = MessageHeader {
            num_required_signatures: header[0],
            num_readonly_signed_accounts: header[1],
            num_readonly_unsigned_accounts: header[2],
        };

        let (count, mut rest) = decode_compact_len(rest)?;
        let mut account_keys = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let (key, tail) = split(rest, PublicKey::SIZE)?;
            account_keys.push(PublicKey::try_from(key).map_err(|_| {
                TransactionError::Truncated {
                    needed: PublicKey::SIZE,
                }
            })?);
            rest = tail;
        }

        let (recent_blockhash, rest) = split(rest, Hash::SIZE)?;
        let recent_blockhash =
            Hash::try_from(recent_blockhash).map_err(|_| TransactionError::Truncated {
                needed: Hash::SIZE,
            })?;

        let (count, mut rest) = decode_compact_len(rest)?;
        let mut instructions = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let (program_id_index, tail) = split(rest, 1)?;
            let (len, tail) = decode_compact_len(tail)?;
            let (accounts, tail) = split(tail, len)?;
            let (len, tail) = decode_compact_len(tail)?;
            let (data, tail) = split(tail, len)?;
            instructions.push(CompiledInstruction {
                program_id_index: program_id_index[0],
                accounts: accounts.to_vec(),
                data: data.to_vec(),
            });
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(TransactionError::TrailingBytes(rest.len()));
        }

        let message = Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        };
        message.check()?;
        Ok(message)
    }

    fn check(&self) -> Result<(), TransactionError> {
        let header = &self.header;
        let signed = usize::from(header.num_required_signatures);
        if signed == 0
            || header.num_readonly_signed_accounts >= header.num_required_signatures
            || signed + usize::from(header.num_readonly_unsigned_accounts)
                > self.account_keys.len()
        {
            return Err(TransactionError::InvalidHeader);
        }

        let keys = self.account_keys.len();
        for instruction in &self.instructions {
            let indices = std::iter::once(&instruction.program_id_index)
                .chain(instruction.accounts.iter());
            if let Some(index) = indices.copied().find(|index| usize::from(*index) >= keys) {
                return Err(TransactionError::InvalidAccountIndex(index));
            }
        }
        Ok(())
    }
}

/// A legacy transaction as exchanged with the wallets.
///
/// The fee payer and the recent blockhash may be left out until the
/// transaction is sent, see [`crate::WalletAdapter::send_transaction`]. On
/// the wire the transaction is the compact-u16 count of signatures, the
/// signatures (64 bytes each, one per signer) and the [`Message`].
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub fee_payer: Option<PublicKey>,
    pub recent_blockhash: Option<Hash>,
    pub instructions: Vec<Instruction>,
    /// in the order of [`Message::signers`], all zero when not signed yet
    pub signatures: Vec<Signature>,
    /// the message as decoded, kept while the fields still describe it so the
    /// key order of the signed bytes is preserved
    decoded: Option<Message>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.fee_payer == other.fee_payer
            && self.recent_blockhash == other.recent_blockhash
            && self.instructions == other.instructions
            && self.signatures == other.signatures
    }
}

impl Eq for Transaction {}

impl Transaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    pub fn with_fee_payer(mut self, fee_payer: PublicKey) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn with_recent_blockhash(mut self, recent_blockhash: Hash) -> Self {
        self.recent_blockhash = Some(recent_blockhash);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signatures
            .iter()
            .any(|signature| *signature != EMPTY_SIGNATURE)
    }

    pub fn compile_message(&self) -> Result<Message, TransactionError> {
        if let Some(message) = self.decoded.as_ref().filter(|message| self.describes(message)) {
            return Ok(message.clone());
        }

        let fee_payer = self.fee_payer.ok_or(TransactionError::MissingFeePayer)?;
        let recent_blockhash = self
            .recent_blockhash
            .ok_or(TransactionError::MissingRecentBlockhash)?;
        Message::compile(fee_payer, recent_blockhash, &self.instructions)
    }

    fn describes(&self, message: &Message) -> bool {
        self.fee_payer == message.fee_payer()
            && self.recent_blockhash == Some(message.recent_blockhash)
            && message
                .decompile()
                .is_ok_and(|instructions| instructions == self.instructions)
    }

    /// the bytes the signers sign
    pub fn message_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        self.compile_message()?.to_bytes()
    }

    /// set the signature of `signer`, one of the keys required to sign
    pub fn add_signature(
        &mut self,
        signer: &PublicKey,
        signature: Signature,
    ) -> Result<(), TransactionError> {
        let message = self.compile_message()?;
        let signers = message.signers();
        let index = signers
            .iter()
            .position(|key| key == signer)
            .ok_or(TransactionError::UnknownSigner(*signer))?;

        if self.signatures.len() < signers.len() {
            self.signatures.resize(signers.len(), EMPTY_SIGNATURE);
        }
        self.signatures[index] = signature;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let message = self.compile_message()?;
        let signers = message.signers().len();
        if self.signatures.len() > signers {
            return Err(TransactionError::TooManySignatures {
                got: self.signatures.len(),
                signers,
            });
        }
        let message = message.to_bytes()?;

        let mut bytes = Vec::with_capacity(3 + signers * Signature::SIZE + message.len());
        encode_compact_len(&mut bytes, signers)?;
        for index in 0..signers {
            let signature = self.signatures.get(index).unwrap_or(&EMPTY_SIGNATURE);
            bytes.extend_from_slice(signature.as_ref());
        }
        bytes.extend_from_slice(&message);

        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (count, mut rest) = decode_compact_len(bytes)?;

        let mut signatures = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            let (signature, tail) = split(rest, Signature::SIZE)?;
            // split guarantees the length
            signatures.push(Signature::try_from(signature).map_err(|_| {
                TransactionError::Truncated {
                    needed: Signature::SIZE,
                }
            })?);
            rest = tail;
        }

        let message = Message::from_bytes(rest)?;
        Ok(Self {
            fee_payer: message.fee_payer(),
            recent_blockhash: Some(message.recent_blockhash),
            instructions: message.decompile()?,
            signatures,
            decoded: Some(message),
        })
    }
}

fn split(bytes: &[u8], at: usize) -> Result<(&[u8], &[u8]), TransactionError> {
    if bytes.len() < at {
        return Err(TransactionError::Truncated {
            needed: at - bytes.len(),
        });
    }
    Ok(bytes.split_at(at))
}

fn encode_compact_len(bytes: &mut Vec<u8>, len: usize) -> Result<(), TransactionError> {
    let mut rem = u16::try_from(len).map_err(|_| TransactionError::LengthOverflow(len))?;
    loop {
        let mut elem = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            bytes.push(elem);
            return Ok(());
        }
        elem |= 0x80;
        bytes.push(elem);
    }
}

fn decode_compact_len(bytes: &[u8]) -> Result<(usize, &[u8]), TransactionError> {
    let mut len = 0usize;
    for (index, byte) in bytes.iter().take(3).enumerate() {
        len |= ((byte & 0x7f) as usize) << (index * 7);
        if byte & 0x80 == 0 {
            return Ok((len, &bytes[index + 1..]));
        }
    }

    if bytes.len() < 3 {
        Err(TransactionError::Truncated { needed: 1 })
    } else {
        Err(TransactionError::InvalidCompactLength)
    }
}
