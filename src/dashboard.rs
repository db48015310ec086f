// 📊 Dashboard - aggregates over the household-scoped record set
//
//   saldo = total_receitas - total_despesas
//
// Period filtering is by the record's created_at *date* (inclusive bounds).
// The monthly series always covers the six months ending with `today` and
// ignores the selected period.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actions::records;
use crate::entities::{Expense, ExpenseStatus, Income, IncomeStatus, User};
use crate::error::AppResult;

const LIST_LIMIT: usize = 5;
const SERIES_MONTHS: u32 = 6;

// ============================================================================
// PERIOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    MesAtual,
    MesAnterior,
    AnoAtual,
    Ultimos30Dias,
    Ultimos90Dias,
    Personalizado { start: NaiveDate, end: NaiveDate },
    Todos,
}

/// Raw `?periodo=&data_inicio=&data_fim=` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    pub periodo: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

impl PeriodQuery {
    /// Missing `periodo` means the current month. An unknown value, or
    /// `personalizado` without both dates, falls back to every period.
    pub fn period(&self) -> Period {
        match self.periodo.as_deref().unwrap_or("mes_atual") {
            "mes_atual" => Period::MesAtual,
            "mes_anterior" => Period::MesAnterior,
            "ano_atual" => Period::AnoAtual,
            "ultimos_30_dias" => Period::Ultimos30Dias,
            "ultimos_90_dias" => Period::Ultimos90Dias,
            "personalizado" => match (self.data_inicio, self.data_fim) {
                (Some(start), Some(end)) => Period::Personalizado { start, end },
                _ => Period::Todos,
            },
            _ => Period::Todos,
        }
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

impl Period {
    pub fn key(&self) -> &'static str {
        match self {
            Period::MesAtual => "mes_atual",
            Period::MesAnterior => "mes_anterior",
            Period::AnoAtual => "ano_atual",
            Period::Ultimos30Dias => "ultimos_30_dias",
            Period::Ultimos90Dias => "ultimos_90_dias",
            Period::Personalizado { .. } => "personalizado",
            Period::Todos => "todos",
        }
    }

    /// Inclusive date range, or None for "all time"
    pub fn range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            Period::MesAtual => Some((month_start(today), month_end(today))),
            Period::MesAnterior => {
                let previous = month_start(today).checked_sub_months(Months::new(1))?;
                Some((previous, month_end(previous)))
            }
            Period::AnoAtual => Some((
                NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(today.year(), 12, 31)?,
            )),
            Period::Ultimos30Dias => Some((today - chrono::Duration::days(30), today)),
            Period::Ultimos90Dias => Some((today - chrono::Duration::days(90), today)),
            Period::Personalizado { start, end } => Some((start, end)),
            Period::Todos => None,
        }
    }

    pub fn label(&self, today: NaiveDate) -> String {
        match self {
            Period::MesAtual => format!("Mês Atual ({})", today.format("%b/%Y")),
            Period::MesAnterior => {
                let previous = month_start(today)
                    .checked_sub_months(Months::new(1))
                    .unwrap_or(today);
                format!("Mês Anterior ({})", previous.format("%b/%Y"))
            }
            Period::AnoAtual => format!("Ano Atual ({})", today.year()),
            Period::Ultimos30Dias => "Últimos 30 dias".to_string(),
            Period::Ultimos90Dias => "Últimos 90 dias".to_string(),
            Period::Personalizado { start, end } => {
                format!("{} - {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y"))
            }
            Period::Todos => "Todos os períodos".to_string(),
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.range(today) {
            Some((start, end)) => start <= date && date <= end,
            None => true,
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Filters {
    pub periodo: &'static str,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub periodo_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_receitas: Decimal,
    pub total_despesas: Decimal,
    pub saldo: Decimal,
    pub receitas_recebidas: Decimal,
    pub receitas_pendentes: Decimal,
    pub despesas_pagas: Decimal,
    pub despesas_pendentes: Decimal,
    pub despesas_vencidas: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: Decimal,
    pub quantidade: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthPoint {
    /// e.g. "Mar/2024"
    pub mes: String,
    pub receitas: Decimal,
    pub despesas: Decimal,
    pub saldo: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub despesas_por_categoria: Vec<GroupTotal>,
    pub receitas_por_tipo: Vec<GroupTotal>,
    pub dados_grafico: Vec<MonthPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lists {
    pub receitas_recentes: Vec<Income>,
    pub despesas_pendentes: Vec<Expense>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub filtros: Filters,
    pub resumo: Totals,
    pub estatisticas: Statistics,
    pub listas: Lists,
}

fn group_totals(items: impl Iterator<Item = (String, Decimal)>) -> Vec<GroupTotal> {
    let mut groups: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for (key, valor) in items {
        let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
        entry.0 += valor;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(key, (total, quantidade))| GroupTotal { key, total, quantidade })
        .collect()
}

fn monthly_series(incomes: &[Income], expenses: &[Expense], today: NaiveDate) -> Vec<MonthPoint> {
    let current = month_start(today);

    (0..SERIES_MONTHS)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|start| {
            let in_month = |date: NaiveDate| date.year() == start.year() && date.month() == start.month();

            let receitas: Decimal = incomes
                .iter()
                .filter(|r| in_month(r.created_at.date_naive()))
                .map(|r| r.valor)
                .sum();
            let despesas: Decimal = expenses
                .iter()
                .filter(|d| in_month(d.created_at.date_naive()))
                .map(|d| d.valor)
                .sum();

            MonthPoint {
                mes: start.format("%b/%Y").to_string(),
                receitas,
                despesas,
                saldo: receitas - despesas,
            }
        })
        .collect()
}

/// Build the dashboard from an already-scoped record set
pub fn summarize(
    incomes: &[Income],
    expenses: &[Expense],
    query: &PeriodQuery,
    today: NaiveDate,
) -> DashboardSummary {
    let period = query.period();

    let period_incomes: Vec<&Income> = incomes
        .iter()
        .filter(|r| period.contains(r.created_at.date_naive(), today))
        .collect();
    let period_expenses: Vec<&Expense> = expenses
        .iter()
        .filter(|d| period.contains(d.created_at.date_naive(), today))
        .collect();

    let income_sum = |status: Option<IncomeStatus>| -> Decimal {
        period_incomes
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.valor)
            .sum()
    };
    let expense_sum = |status: Option<ExpenseStatus>| -> Decimal {
        period_expenses
            .iter()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .map(|d| d.valor)
            .sum()
    };

    let total_receitas = income_sum(None);
    let total_despesas = expense_sum(None);
    let resumo = Totals {
        total_receitas,
        total_despesas,
        saldo: total_receitas - total_despesas,
        receitas_recebidas: income_sum(Some(IncomeStatus::Recebido)),
        receitas_pendentes: income_sum(Some(IncomeStatus::Pendente)),
        despesas_pagas: expense_sum(Some(ExpenseStatus::Pago)),
        despesas_pendentes: expense_sum(Some(ExpenseStatus::Pendente)),
        despesas_vencidas: expense_sum(Some(ExpenseStatus::Vencido)),
    };

    let estatisticas = Statistics {
        despesas_por_categoria: group_totals(
            period_expenses.iter().map(|d| (d.categoria.clone(), d.valor)),
        ),
        receitas_por_tipo: group_totals(
            period_incomes.iter().map(|r| (r.tipo.as_str().to_string(), r.valor)),
        ),
        dados_grafico: monthly_series(incomes, expenses, today),
    };

    // Lists ignore the period
    let mut receitas_recentes: Vec<Income> = incomes.to_vec();
    receitas_recentes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    receitas_recentes.truncate(LIST_LIMIT);

    let mut despesas_pendentes: Vec<Expense> = expenses
        .iter()
        .filter(|d| d.status == ExpenseStatus::Pendente)
        .cloned()
        .collect();
    despesas_pendentes.sort_by(|a, b| a.data_vencimento.cmp(&b.data_vencimento).then(a.id.cmp(&b.id)));
    despesas_pendentes.truncate(LIST_LIMIT);

    DashboardSummary {
        filtros: Filters {
            periodo: period.key(),
            data_inicio: query.data_inicio,
            data_fim: query.data_fim,
            periodo_label: period.label(today),
        },
        resumo,
        estatisticas,
        listas: Lists {
            receitas_recentes,
            despesas_pendentes,
        },
    }
}

/// Load the actor's scoped records and summarize them
pub fn dashboard_for(
    conn: &Connection,
    actor: &User,
    query: &PeriodQuery,
    today: NaiveDate,
) -> AppResult<DashboardSummary> {
    let incomes = records::list::<Income>(conn, actor)?;
    let expenses = records::list::<Expense>(conn, actor)?;
    Ok(summarize(&incomes, &expenses, query, today))
}
